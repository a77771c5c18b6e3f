//! Parameter files describing the particles of a reconstruction.
//!
//! A project is a hierarchy of fields, micrographs and particles, written in
//! TOML:
//!
//! ```toml
//! [[field]]
//! id = "grid-1"
//!
//! [[field.micrograph]]
//! particle_file = "particles.rdn"   # relative to the project file
//! pixel_size = "1.6 Å"
//!
//! [[field.micrograph.particle]]
//! id = 1                            # image number in `particle_file`, from 1
//! euler = [12.0, 90.0, -45.0]       # phi, theta, psi in degrees
//! fom = [0.42]
//! selected = true
//! origin = [31.5, 32.0]
//! ```

use std::path::{Path, PathBuf};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use geometry::Euler;
use units::{angstrom_, degree, parse_length, Length};

use crate::error::{RadonError, Result};
use crate::verbosity::Verbosity;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Project {
    #[serde(rename = "field", default)]
    pub fields: Vec<Field>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Field {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "micrograph", default)]
    pub micrographs: Vec<Micrograph>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Micrograph {
    /// Stack holding the particle images, one per plane
    pub particle_file: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "deserialize_length_opt", serialize_with = "serialize_length_opt")]
    pub pixel_size: Option<Length>,

    #[serde(rename = "particle", default)]
    pub particles: Vec<Particle>,

    /// Directory of the project file this micrograph was read from
    #[serde(skip)]
    pub base: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Particle {
    pub id: usize,
    /// `[phi, theta, psi]` in degrees
    pub euler: [f32; 3],
    #[serde(default)]
    pub fom: Vec<f32>,
    #[serde(default = "yes")]
    pub selected: bool,
    /// Centre of the particle in its image, in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<[f32; 2]>,
}

fn yes() -> bool { true }

fn deserialize_length_opt<'d, D: Deserializer<'d>>(deserializer: D) -> std::result::Result<Option<Length>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw { Number(f32), Text(String) }

    Option::<Raw>::deserialize(deserializer)?
        .map(|raw| match raw {
            Raw::Number(x) => Ok(units::angstrom(x)),
            Raw::Text(s)   => parse_length(&s),
        })
        .transpose()
        .map_err(de::Error::custom)
}

fn serialize_length_opt<S: Serializer>(length: &Option<Length>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match length {
        Some(l) => serializer.serialize_str(&format!("{} Å", angstrom_(*l))),
        None    => serializer.serialize_none(),
    }
}

impl Micrograph {
    /// `particle_file` as seen from the working directory
    pub fn resolved_particle_file(&self) -> PathBuf { self.base.join(&self.particle_file) }

    /// `particle_file` as it must be written in a project file stored in `dir`
    fn particle_file_from(&self, dir: &Path) -> Result<PathBuf> {
        if self.particle_file.is_absolute() || self.base == dir {
            return Ok(self.particle_file.clone());
        }
        let cwd = std::env::current_dir().map_err(RadonError::io("."))?;
        Ok(cwd.join(self.resolved_particle_file()))
    }
}

impl Particle {
    pub fn view(&self) -> Euler {
        let [phi, theta, psi] = self.euler;
        Euler::from_angles(degree(phi), degree(theta), degree(psi))
    }

    /// Selection by figure of merit when `threshold` is positive, otherwise
    /// by the stored flag.
    pub fn passes(&self, threshold: f32) -> bool {
        if threshold > 0.0 {
            self.fom.first().map_or(false, |&fom| fom >= threshold)
        } else {
            self.selected
        }
    }
}

/// A particle chosen for reconstruction, with everything needed to load it
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedParticle {
    pub file: PathBuf,
    pub id: usize,
    pub view: Euler,
    pub origin: Option<[f32; 2]>,
}

impl Project {

    pub fn particle_count(&self) -> usize {
        self.micrographs().map(|m| m.particles.len()).sum()
    }

    pub fn micrographs(&self) -> impl Iterator<Item = &Micrograph> {
        self.fields.iter().flat_map(|f| f.micrographs.iter())
    }

    pub fn select(&self, threshold: f32) -> Vec<SelectedParticle> {
        self.micrographs()
            .flat_map(|m| m.particles.iter()
                      .filter(move |p| p.passes(threshold))
                      .map(move |p| SelectedParticle {
                          file: m.resolved_particle_file(),
                          id: p.id,
                          view: p.view(),
                          origin: p.origin,
                      }))
            .collect()
    }

    /// Store the outcome of `select(threshold)` in the particles' flags
    pub fn apply_selection(&mut self, threshold: f32) {
        for p in self.fields.iter_mut()
            .flat_map(|f| f.micrographs.iter_mut())
            .flat_map(|m| m.particles.iter_mut())
        {
            p.selected = p.passes(threshold);
        }
    }

    fn micrographs_mut(&mut self) -> impl Iterator<Item = &mut Micrograph> {
        self.fields.iter_mut().flat_map(|f| f.micrographs.iter_mut())
    }

    fn set_base(&mut self, base: &Path) {
        for m in self.micrographs_mut() {
            m.base = base.to_path_buf();
        }
    }
}

pub fn read_project(path: impl AsRef<Path>) -> Result<Project> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(RadonError::io(path))?;
    let mut project: Project = toml::from_str(&text)
        .map_err(|source| RadonError::Project { path: path.to_path_buf(), source })?;
    project.set_base(path.parent().unwrap_or_else(|| Path::new("")));
    Ok(project)
}

/// Merge several project files. Files that cannot be read are reported and
/// skipped; it is an error if none can be read, or if they hold no particles.
pub fn read_projects<P: AsRef<Path>>(paths: &[P], verbosity: Verbosity) -> Result<Project> {
    if paths.is_empty() {
        return Err(RadonError::MissingInput("no parameter files specified".into()));
    }
    let mut merged = Project::default();
    let mut readable = 0;
    for path in paths {
        match read_project(path) {
            Ok(project) => {
                if verbosity.process() {
                    println!("Reading {}: {} particles", path.as_ref().display(), project.particle_count());
                }
                readable += 1;
                merged.fields.extend(project.fields);
            }
            Err(e) => eprintln!("Warning: skipping {e}"),
        }
    }
    if readable == 0 {
        return Err(RadonError::MissingInput("no parameter files could be read".into()));
    }
    if merged.particle_count() == 0 {
        return Err(RadonError::MissingInput("project is empty".into()));
    }
    Ok(merged)
}

/// Write `project` to `path`, rewriting particle files that would otherwise
/// no longer be found from the new location.
pub fn write_project(project: &Project, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut relocated = project.clone();
    for m in relocated.micrographs_mut() {
        m.particle_file = m.particle_file_from(dir)?;
        m.base = dir.to_path_buf();
    }
    let text = toml::to_string(&relocated)?;
    std::fs::write(path, text).map_err(RadonError::io(path))
}
