use huestack_core::{Error, Lut3D};
use huestack_io::{IoError, load_cube, load_hald, save_cube, save_hald};

fn warm_lut(size: usize) -> Lut3D {
    let mut lut = Lut3D::identity(size).expect("valid size");
    for b in 0..size {
        for g in 0..size {
            for r in 0..size {
                let [x, y, z] = lut.get(r, g, b);
                lut.set(r, g, b, [(x * 1.1).min(1.0), y, z * 0.9]).expect("in bounds");
            }
        }
    }
    lut
}

#[test]
fn hald_png_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    for size in [9, 17] {
        let path = dir.path().join(format!("hald_{size}.png"));
        let identity = Lut3D::identity(size).expect("valid size");
        save_hald(&path, &identity).expect("saves hald");
        let loaded = load_hald(&path, size).expect("loads hald");
        assert_eq!(loaded, identity, "identity {size} survives a PNG round trip");
    }
}

#[test]
fn hald_with_wrong_size_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("small.png");
    save_hald(&path, &Lut3D::identity(4).expect("valid size")).expect("saves hald");
    let err = load_hald(&path, 9).expect_err("16x16 image cannot hold a 9³ lattice");
    assert!(matches!(err, IoError::Core(Error::Conversion(_))));
}

#[test]
fn cube_file_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("warm.cube");
    let lut = warm_lut(5);
    save_cube(&path, &lut).expect("saves cube");
    assert_eq!(load_cube(&path).expect("loads cube"), lut);
}

#[test]
fn malformed_cube_is_a_format_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.cube");
    std::fs::write(&path, "LUT_3D_SIZE 2\n0 0 0\n1 1\n").expect("write file");
    assert!(matches!(load_cube(&path), Err(IoError::Core(Error::Format(_)))));
}
