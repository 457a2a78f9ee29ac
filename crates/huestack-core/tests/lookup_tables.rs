use huestack_core::{Lut1D, Lut3D, build_lut_from_control_points};

/// Lattice coordinate of node `i` on one axis.
fn grid(i: usize, size: usize) -> f32 {
    i as f32 / (size - 1) as f32
}

fn graded(size: usize) -> Lut3D {
    let mut lut = Lut3D::identity(size).expect("valid size");
    for b in 0..size {
        for g in 0..size {
            for r in 0..size {
                let [x, y, z] = lut.get(r, g, b);
                let value = [x.powf(0.8), 0.5 * y + 0.25 * x * z, (z * z + y) / 2.0];
                lut.set(r, g, b, value).expect("in bounds");
            }
        }
    }
    lut
}

#[test]
fn hald_identity_round_trip_is_exact() {
    for size in [9, 17, 33] {
        let identity = Lut3D::identity(size).expect("valid size");
        let hald = identity.hald_image().expect("small lattice");
        assert_eq!(hald.width as usize, size * size);
        assert_eq!(hald.height as usize, size * size);
        let decoded = Lut3D::from_hald_image(&hald, size).expect("decodes");
        assert_eq!(decoded, identity, "identity {size}");
    }
}

#[test]
fn cube_file_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    for size in [2, 9, 17] {
        let lut = graded(size);
        let path = dir.path().join(format!("graded_{size}.cube"));
        lut.write_cube_file(&path).expect("writes");
        let read = Lut3D::read_cube(&path).expect("reads");
        assert_eq!(read.size(), size);
        for (a, b) in read.data().iter().zip(lut.data()) {
            for c in 0..3 {
                assert!((a[c] - b[c]).abs() <= f32::EPSILON, "{a:?} vs {b:?}");
            }
        }
    }
}

#[test]
fn trilinear_lookup_is_continuous_across_nodes() {
    let size = 9;
    let lut = graded(size);
    let delta = 1e-5_f32;
    for i in 1..size - 1 {
        let edge = grid(i, size);
        for axis in 0..3 {
            let mut below = [0.37_f32, 0.61, 0.18];
            let mut above = below;
            below[axis] = edge - delta;
            above[axis] = edge + delta;
            let lo = lut.lookup_trilinear(below);
            let hi = lut.lookup_trilinear(above);
            for c in 0..3 {
                assert!(
                    (lo[c] - hi[c]).abs() < 1e-4,
                    "axis {axis} node {i} channel {c}: {} vs {}",
                    lo[c],
                    hi[c]
                );
            }
        }
    }
}

#[test]
fn trilinear_lookup_hits_nodes_exactly() {
    let size = 5;
    let lut = graded(size);
    for (r, g, b) in [(0, 0, 0), (4, 4, 4), (1, 3, 2), (4, 0, 3)] {
        let rgb = [grid(r, size), grid(g, size), grid(b, size)];
        let out = lut.lookup_trilinear(rgb);
        let node = lut.get(r, g, b);
        for c in 0..3 {
            assert!((out[c] - node[c]).abs() < 1e-5, "node ({r},{g},{b})");
        }
    }
}

#[test]
fn control_point_curves_are_monotone() {
    let configurations: &[&[[f32; 2]]] = &[
        &[[0.0, 0.0], [255.0, 255.0]],
        &[[0.0, 128.0], [255.0, 128.0]],
        &[[30.0, 90.0], [200.0, 90.0]],
        &[[0.0, 0.0], [64.0, 200.0], [128.0, 210.0], [255.0, 255.0]],
        &[[0.0, 0.0], [10.0, 250.0], [20.0, 251.0], [255.0, 255.0]],
        &[[0.0, 20.0], [100.0, 20.0], [101.0, 240.0], [255.0, 240.0]],
        &[[0.0, 255.0], [255.0, 0.0]],
        &[[255.0, 10.0], [0.0, 5.0], [128.0, 300.0]],
    ];
    for points in configurations {
        let lut = build_lut_from_control_points(points).expect("valid points");
        assert!(lut.is_monotone(), "{points:?} produced {lut:?}");
    }
}

#[test]
fn identity_curve_composition() {
    let curve = build_lut_from_control_points(&[[0.0, 0.0], [128.0, 180.0], [255.0, 255.0]])
        .expect("valid points");
    assert_eq!(curve.then(&Lut1D::identity()), curve);
    assert_eq!(Lut1D::identity().then(&curve), curve);
}
