//! Reading and writing volumes.
//!
//! A volume file is a little-endian header followed by the samples, `x`
//! varying fastest:
//!
//! ```text
//! "RDNV" | type: u8 | nx ny nz: u32 | sampling: 3 × f32 | origin: 3 × f32 | samples
//! ```
//!
//! Image stacks (one particle image per `z` plane) use the same format, and
//! single images can be read from them without loading the whole stack.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::path::Path;

use binrw::{binrw, BinReaderExt, BinWrite, VecArgs};
use ndarray::{Array3, Axis};
use num_traits::{Bounded, NumCast, ToPrimitive, Zero};

use crate::error::{RadonError, Result};
use crate::volume::Volume;

/// Storage type of the samples on disk
#[binrw]
#[brw(repr = u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    U8  = 1,
    I16 = 2,
    F32 = 3,
}

impl DataType {
    fn bytes(self) -> u64 {
        match self {
            Self::U8  => 1,
            Self::I16 => 2,
            Self::F32 => 4,
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u" | "c" | "byte"  => Ok(Self::U8),
            "s" | "short"       => Ok(Self::I16),
            "f" | "float"       => Ok(Self::F32),
            _ => Err(format!("unknown data type `{s}` (use u, s or f)")),
        }
    }
}

#[binrw]
#[brw(little, magic = b"RDNV")]
#[derive(Clone, Debug, PartialEq)]
struct Header {
    datatype: DataType,
    shape   : [u32; 3],
    sampling: [f32; 3],
    origin  : [f32; 3],
}

impl Header {
    fn of(volume: &Volume, datatype: DataType) -> Result<Self> {
        let [nx, ny, nz] = volume.shape();
        let size = |n: usize| u32::try_from(n)
            .map_err(|_| RadonError::InvalidArgument(format!("volume extent {n} too large to store")));
        Ok(Self { datatype, shape: [size(nx)?, size(ny)?, size(nz)?], sampling: volume.sampling, origin: volume.origin })
    }

    fn plane_len(&self) -> usize { self.shape[0] as usize * self.shape[1] as usize }
}

fn open(path: &Path) -> Result<(BufReader<File>, Header)> {
    let file = File::open(path).map_err(RadonError::io(path))?;
    let mut reader = BufReader::new(file);
    let header: Header = reader.read_le().map_err(format_error(path))?;
    Ok((reader, header))
}

fn format_error(path: &Path) -> impl FnOnce(binrw::Error) -> RadonError + '_ {
    move |source| RadonError::Format { path: path.to_path_buf(), source }
}

fn read_samples(reader: &mut BufReader<File>, datatype: DataType, count: usize, path: &Path) -> Result<Vec<f32>> {
    let args = |count| VecArgs { count, inner: () };
    let samples = match datatype {
        DataType::U8  => reader.read_le_args::<Vec<u8 >>(args(count)).map(widen),
        DataType::I16 => reader.read_le_args::<Vec<i16>>(args(count)).map(widen),
        DataType::F32 => reader.read_le_args::<Vec<f32>>(args(count)),
    };
    samples.map_err(format_error(path))
}

fn widen<T: ToPrimitive>(v: Vec<T>) -> Vec<f32> {
    v.into_iter().map(|x| x.to_f32().unwrap_or(0.0)).collect()
}

/// Samples stored with `x` fastest, as `[x, y, z]`
fn assemble(samples: Vec<f32>, [nx, ny, nz]: [usize; 3], path: &Path) -> Result<Array3<f32>> {
    let data = Array3::from_shape_vec((nz, ny, nx), samples)
        .map_err(|_| RadonError::MissingInput(format!("{}: truncated sample data", path.display())))?;
    Ok(data.permuted_axes([2, 1, 0]).as_standard_layout().into_owned())
}

pub fn read_volume(path: impl AsRef<Path>) -> Result<Volume> {
    let path = path.as_ref();
    let (mut reader, header) = open(path)?;
    let shape = header.shape.map(|n| n as usize);
    let samples = read_samples(&mut reader, header.datatype, shape.iter().product(), path)?;
    Ok(Volume { data: assemble(samples, shape, path)?, sampling: header.sampling, origin: header.origin })
}

/// Number of images in a stack file, and their shape
pub fn read_shape(path: impl AsRef<Path>) -> Result<[usize; 3]> {
    let (_, header) = open(path.as_ref())?;
    Ok(header.shape.map(|n| n as usize))
}

/// Read the `z`-th image of a stack as a volume of depth one.
pub fn read_slice(path: impl AsRef<Path>, z: usize) -> Result<Volume> {
    let path = path.as_ref();
    let (mut reader, header) = open(path)?;
    let [nx, ny, nz] = header.shape.map(|n| n as usize);
    if z >= nz {
        return Err(RadonError::MissingInput(format!("{}: image {} requested from a stack of {nz}", path.display(), z + 1)));
    }
    let skip = (z * header.plane_len()) as u64 * header.datatype.bytes();
    reader.seek(SeekFrom::Current(skip as i64)).map_err(RadonError::io(path))?;
    let samples = read_samples(&mut reader, header.datatype, header.plane_len(), path)?;
    let data = assemble(samples, [nx, ny, 1], path)?;
    let [ox, oy, _] = header.origin;
    Ok(Volume { data, sampling: header.sampling, origin: [ox, oy, 0.0] })
}

/// Round and clamp into the range of `T`
fn narrow<T: Bounded + NumCast + Zero + ToPrimitive>(v: f32) -> T {
    let lo = T::min_value().to_f32().unwrap_or(f32::MIN);
    let hi = T::max_value().to_f32().unwrap_or(f32::MAX);
    <T as NumCast>::from(v.round().clamp(lo, hi)).unwrap_or_else(T::zero)
}

pub fn write_volume(volume: &Volume, path: impl AsRef<Path>, datatype: DataType) -> Result<()> {
    let path = path.as_ref();
    let header = Header::of(volume, datatype)?;
    let file = File::create(path).map_err(RadonError::io(path))?;
    let mut writer = BufWriter::new(file);
    // z slowest, x fastest
    let ordered = volume.data.view().permuted_axes([2, 1, 0]);
    let samples = ordered.iter().copied();
    let written = header.write(&mut writer).and_then(|()| match datatype {
        DataType::U8  => samples.map(narrow::<u8 >).collect::<Vec<_>>().write_le(&mut writer),
        DataType::I16 => samples.map(narrow::<i16>).collect::<Vec<_>>().write_le(&mut writer),
        DataType::F32 => samples.collect::<Vec<_>>().write_le(&mut writer),
    });
    written.map_err(format_error(path))?;
    std::io::Write::flush(&mut writer).map_err(RadonError::io(path))
}

/// Write the planes of `images` (one image per `z`) as a stack
pub fn write_stack<'a>(images: impl IntoIterator<Item = &'a Volume>, path: impl AsRef<Path>, datatype: DataType) -> Result<()> {
    let images: Vec<&Volume> = images.into_iter().collect();
    let Some(first) = images.first() else {
        return Err(RadonError::MissingInput("no images to write".into()));
    };
    let views = images.iter().map(|v| v.data.view()).collect::<Vec<_>>();
    let data = ndarray::concatenate(Axis(2), &views)
        .map_err(|_| RadonError::mismatch("image stack", &first.shape()[..2], &[]))?;
    write_volume(&Volume { data, sampling: first.sampling, origin: first.origin }, path, datatype)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn numbered(nx: usize, ny: usize, nz: usize) -> Volume {
        let mut v = Volume::new(Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| (x + 10 * y + 100 * z) as f32 - 50.0));
        v.sampling = [1.5, 1.5, 2.0];
        v
    }

    #[test]
    fn float_roundtrip() -> Result<()> {
        let dir = tempdir().map_err(RadonError::io("tempdir"))?;
        let path = dir.path().join("v.rdn");
        let original = numbered(3, 4, 5);
        write_volume(&original, &path, DataType::F32)?;
        assert_eq!(read_volume(&path)?, original);
        assert_eq!(read_shape(&path)?, [3, 4, 5]);
        Ok(())
    }

    #[test]
    fn resliced_volume_is_written_in_logical_order() -> Result<()> {
        let dir = tempdir().map_err(RadonError::io("tempdir"))?;
        let path = dir.path().join("r.rdn");
        let resliced = numbered(2, 3, 4).reslice(crate::volume::AxisOrder::ZXY);
        write_volume(&resliced, &path, DataType::F32)?;
        let back = read_volume(&path)?;
        assert_eq!(back.data, resliced.data);
        assert!(back.data.is_standard_layout());
        Ok(())
    }

    #[rstest(/**/ datatype     , value , stored,
             case(DataType::U8 , -3.0  , 0.0   ),
             case(DataType::U8 , 300.0 , 255.0 ),
             case(DataType::U8 , 12.6  , 13.0  ),
             case(DataType::I16, -12.4 , -12.0 ),
             case(DataType::I16, 4.0e5 , 32767.0),
             case(DataType::F32, 0.25  , 0.25  ),
    )]
    fn conversion_rounds_and_clamps(datatype: DataType, value: f32, stored: f32) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.rdn");
        let v = Volume::new(Array3::from_elem((2, 1, 1), value));
        write_volume(&v, &path, datatype).unwrap();
        let back = read_volume(&path).unwrap();
        assert!(back.data.iter().all(|&x| x == stored), "{:?}", back.data);
    }

    #[test]
    fn single_images_from_a_stack() -> Result<()> {
        let dir = tempdir().map_err(RadonError::io("tempdir"))?;
        let path = dir.path().join("stack.rdn");
        let stack = numbered(4, 3, 6);
        write_volume(&stack, &path, DataType::I16)?;
        let image = read_slice(&path, 4)?;
        assert_eq!(image.shape(), [4, 3, 1]);
        assert_eq!(image.data.index_axis(Axis(2), 0), stack.data.index_axis(Axis(2), 4));
        assert!(matches!(read_slice(&path, 6), Err(RadonError::MissingInput(_))));
        Ok(())
    }

    #[test]
    fn stacks_are_assembled_from_images() -> Result<()> {
        let dir = tempdir().map_err(RadonError::io("tempdir"))?;
        let path = dir.path().join("images.rdn");
        let images = [numbered(4, 4, 1), numbered(4, 4, 1)];
        write_stack(&images, &path, DataType::F32)?;
        assert_eq!(read_shape(&path)?, [4, 4, 2]);
        assert_eq!(read_slice(&path, 1)?.data, images[1].data);
        Ok(())
    }

    #[test]
    fn garbage_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.rdn");
        std::fs::write(&path, b"NOPE and then some").unwrap();
        assert!(matches!(read_volume(&path), Err(RadonError::Format { .. })));
        assert!(matches!(read_volume(dir.path().join("absent")), Err(RadonError::Io { .. })));
    }

    #[rstest(/**/ text , expected,
             case("f"  , Ok(DataType::F32)),
             case("S"  , Ok(DataType::I16)),
             case("byte", Ok(DataType::U8)),
             case("q"  , Err(())),
    )]
    fn parse_datatype(text: &str, expected: std::result::Result<DataType, ()>) {
        assert_eq!(text.parse::<DataType>().map_err(|_| ()), expected);
    }
}
