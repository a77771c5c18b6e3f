use std::path::Path;
use std::process::{Command, Output};

use ndarray::Array3;
use tempfile::tempdir;

use radonrec::io::{read_volume, write_volume, DataType};
use radonrec::Volume;

fn radon(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_radon"))
        .args(args)
        .output()
        .expect("radon did not start")
}

fn point_volume(path: &Path, n: usize) {
    let mut data = Array3::zeros((n, n, n));
    data[[n / 2 + 2, n / 2 - 1, n / 2]] = 1.0;
    write_volume(&Volume::new(data), path, DataType::F32).unwrap();
}

fn s(path: &Path) -> &str { path.to_str().unwrap() }

#[test]
fn pocs_without_mask_is_refused_before_writing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.rdn");
    let output = dir.path().join("out.rdn");
    point_volume(&input, 8);

    let out = radon(&["-forward", "4", "-pocs", "1,5,30,30,0", s(&input), s(&output)]);
    assert!(!out.status.success());
    assert!(!output.exists());
    assert!(String::from_utf8_lossy(&out.stderr).contains("mask"));
}

#[test]
fn missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.rdn");
    let out = radon(&["-forward", "4", s(&dir.path().join("absent.rdn")), s(&output)]);
    assert!(!out.status.success());
    assert!(!output.exists());
}

#[test]
fn forward_and_inverse_quarter_transform() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.rdn");
    let transform = dir.path().join("t.rdn");
    let output = dir.path().join("out.rdn");
    point_volume(&input, 8);

    let out = radon(&["-forward", "4", "-verbose", "0", s(&input), s(&transform)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(read_volume(&transform).unwrap().shape(), [8, 8, 8]);

    let out = radon(&["-backward", "4", "-datatype", "s", "-verbose", "0", s(&transform), s(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(read_volume(&output).unwrap().shape(), [8, 8, 8]);
}

#[test]
fn single_inner_cycle_needs_no_mask() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.rdn");
    let output = dir.path().join("out.rdn");
    point_volume(&input, 8);

    let out = radon(&["-forward", "4", "-pocs", "2,1", "-backward", "4", "-verbose", "0", s(&input), s(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(read_volume(&output).unwrap().data.iter().all(|v| v.is_finite()));
}

#[test]
fn full_transform_is_inverted_at_its_own_size() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.rdn");
    let transform = dir.path().join("t.rdn");
    let output = dir.path().join("out.rdn");
    point_volume(&input, 6);

    let out = radon(&["-forward", "3", "-verbose", "0", s(&input), s(&transform)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(read_volume(&transform).unwrap().shape(), [16, 16, 8]);

    // [16, 16, 8] would be padded to a 16 cube if it were resized
    let out = radon(&["-backward", "3", "-verbose", "0", s(&transform), s(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(read_volume(&output).unwrap().shape(), [8, 8, 8]);
}

#[test]
fn mask_of_the_wrong_size_skips_pocs_with_a_warning() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.rdn");
    let mask = dir.path().join("mask.rdn");
    let output = dir.path().join("out.rdn");
    point_volume(&input, 8);
    write_volume(&Volume::new(Array3::ones((4, 4, 1))), &mask, DataType::F32).unwrap();

    let out = radon(&["-forward", "4", "-pocs", "1,3", "-mask", s(&mask), "-verbose", "0", s(&input), s(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("POCS filtering skipped"));
    assert_eq!(read_volume(&output).unwrap().shape(), [8, 8, 8]);
}
