use std::process::Command;

use ndarray::Array3;
use tempfile::tempdir;

use radonrec::io::{read_volume, write_volume, DataType};
use radonrec::Volume;

#[test]
fn no_parameter_files_is_an_error() {
    let out = Command::new(env!("CARGO_BIN_EXE_radonrecon")).output().unwrap();
    assert!(!out.status.success());
}

#[test]
fn reconstruction_from_a_small_project() {
    let dir = tempdir().unwrap();
    let stack = dir.path().join("particles.rdn");
    let n = 8;
    let data = Array3::from_shape_fn((n, n, 3), |(x, y, _)| {
        let r2 = (x as f32 - 4.0).powi(2) + (y as f32 - 4.0).powi(2);
        (-r2 / 3.0).exp()
    });
    write_volume(&Volume::new(data), &stack, DataType::F32).unwrap();

    let project = dir.path().join("project.toml");
    std::fs::write(&project, r#"
        [[field]]
        id = "test"

        [[field.micrograph]]
        particle_file = "particles.rdn"
        pixel_size = "2 Å"

        [[field.micrograph.particle]]
        id = 1
        euler = [0.0, 0.0, 0.0]

        [[field.micrograph.particle]]
        id = 2
        euler = [30.0, 60.0, 10.0]

        [[field.micrograph.particle]]
        id = 3
        euler = [120.0, 90.0, 45.0]
        selected = false
    "#).unwrap();

    let reconstruction = dir.path().join("rec.rdn");
    let mask = dir.path().join("mask.rdn");
    let output = dir.path().join("selected.toml");
    let out = Command::new(env!("CARGO_BIN_EXE_radonrecon"))
        .args(["-symmetry", "D2", "-verbose", "0",
               "-reconstruction", reconstruction.to_str().unwrap(),
               "-mask", mask.to_str().unwrap(),
               "-output", output.to_str().unwrap(),
               project.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let rec = read_volume(&reconstruction).unwrap();
    assert_eq!(rec.shape(), [n, n, n]);
    assert_eq!(rec.sampling, [2.0; 3]);
    let mask = read_volume(&mask).unwrap();
    assert_eq!(mask.shape(), [n, n, 1]);
    assert!(mask.data.iter().all(|&m| m == 0.0 || m == 1.0));
    assert!(output.exists());
}
