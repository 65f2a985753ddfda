//! End-to-end tests: detect (synthetically) in A, crop, export, import, match
//! in B.

use orb_match::*;
use rand::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_descriptor(rng: &mut StdRng) -> [u8; 32] {
    let mut d = [0u8; 32];
    rng.fill(&mut d[..]);
    d
}

/// Flip `n` distinct bits of a descriptor.
fn perturb(mut d: [u8; 32], n: usize, rng: &mut StdRng) -> [u8; 32] {
    let bits = rand::seq::index::sample(rng, 256, n);
    for b in bits.iter() {
        d[b / 8] ^= 1 << (b % 8);
    }
    d
}

struct Scene {
    image_a: ImageSize,
    image_b: ImageSize,
    roi: Roi,
    /// Full-image A pixels to image B pixels.
    truth: Homography,
    reference: FeatureSet,
    target: FeatureSet,
    /// Indices (into the cropped reference) whose target was displaced.
    displaced: Vec<usize>,
}

fn scene() -> Scene {
    let mut rng = StdRng::seed_from_u64(2024);
    let image_a = ImageSize::new(640, 480);
    let image_b = ImageSize::new(800, 600);
    let roi = Roi::new(100, 80, 200, 160);
    let truth = Homography::from_row_major([
        1.15, 0.08, 35.0, -0.06, 1.1, 20.0, 1.5e-4, -1e-4, 1.0,
    ]);

    let mut kps_a = Vec::new();
    let mut rows_a = Vec::new();
    // 40 keypoints inside the ROI, 20 outside it.
    while kps_a.len() < 60 {
        let inside = kps_a.len() < 40;
        let (x, y) = if inside {
            (
                rng.gen_range(101.0..299.0),
                rng.gen_range(81.0..239.0),
            )
        } else {
            (rng.gen_range(320.0..630.0), rng.gen_range(250.0..470.0))
        };
        kps_a.push(
            Keypoint::new(x, y)
                .with_size(31.0)
                .with_angle(rng.gen_range(0.0..360.0))
                .with_response(rng.gen_range(1e-4..1e-2)),
        );
        rows_a.push(random_descriptor(&mut rng));
    }
    let descriptors_a = DescriptorMatrix::from_rows(&rows_a).unwrap();
    let detected = FeatureSet::new(kps_a.clone(), descriptors_a, image_a).unwrap();
    let reference = detected.crop(&roi).unwrap();
    assert_eq!(reference.len(), 40);

    let displaced = vec![3usize, 11, 19, 27, 35];
    let mut kps_b = Vec::new();
    let mut rows_b = Vec::new();
    for (i, (kp, row)) in kps_a.iter().zip(&rows_a).take(40).enumerate() {
        let mut p = truth.project([kp.x, kp.y]).unwrap();
        if displaced.contains(&i) {
            p = [p[0] + 60.0, p[1] - 45.0];
        }
        let mut row_b = [0u8; 32];
        row_b.copy_from_slice(row);
        kps_b.push(Keypoint::new(p[0], p[1]).with_size(31.0));
        rows_b.push(perturb(row_b, 3, &mut rng));
    }
    // Unrelated clutter in B.
    for _ in 0..30 {
        kps_b.push(Keypoint::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0)));
        rows_b.push(random_descriptor(&mut rng));
    }
    // Shuffle B so target indices do not line up with source indices.
    let mut order: Vec<usize> = (0..kps_b.len()).collect();
    order.shuffle(&mut rng);
    let kps_b: Vec<Keypoint> = order.iter().map(|&i| kps_b[i]).collect();
    let rows_b: Vec<[u8; 32]> = order.iter().map(|&i| rows_b[i]).collect();
    let target = FeatureSet::new(kps_b, DescriptorMatrix::from_rows(&rows_b).unwrap(), image_b)
        .unwrap();

    Scene {
        image_a,
        image_b,
        roi,
        truth,
        reference,
        target,
        displaced,
    }
}

#[test]
fn exported_crop_features_locate_region_in_second_image() {
    init_logger();
    let scene = scene();

    let json = export_features(&scene.reference).unwrap();
    let imported = import_features(&json).unwrap();
    assert_eq!(imported.space(), CoordinateSpace::Normalized);
    assert_eq!(imported.image_size(), scene.roi.size());

    let result = match_features(&imported, &scene.target, &MatchSettings::default()).unwrap();
    assert_eq!(result.correspondences.len(), 40);
    assert_eq!(result.inliers.len(), result.correspondences.len());
    assert_eq!(result.inlier_count, 35);
    assert!((result.inlier_ratio() - 35.0 / 40.0).abs() < 1e-12);

    for (c, &inlier) in result.correspondences.iter().zip(&result.inliers) {
        assert_eq!(inlier, !scene.displaced.contains(&c.source_index));
    }
    for w in result.correspondences.windows(2) {
        assert!(w[0].distance <= w[1].distance);
    }

    // The homography works in crop-local source pixels.
    let h = result.homography.as_ref().expect("homography");
    let local_to_b = scene.truth.h
        * nalgebra::Matrix3::new(
            1.0,
            0.0,
            scene.roi.x as f64,
            0.0,
            1.0,
            scene.roi.y as f64,
            0.0,
            0.0,
            1.0,
        );
    let expected = Homography::new(local_to_b);
    for p in [[0.0, 0.0], [200.0, 0.0], [100.0, 80.0], [200.0, 160.0]] {
        let a = h.project(p).unwrap();
        let b = expected.project(p).unwrap();
        assert!((a[0] - b[0]).abs() < 1e-3 && (a[1] - b[1]).abs() < 1e-3, "{a:?} vs {b:?}");
    }

    let outline = result
        .project_roi(&Roi::full(imported.image_size()))
        .unwrap();
    let roi_in_b = scene.truth.project([scene.roi.x as f64, scene.roi.y as f64]).unwrap();
    assert!((outline[0][0] - roi_in_b[0]).abs() < 1e-3);
    assert!((outline[0][1] - roi_in_b[1]).abs() < 1e-3);
    let (w, h) = (scene.image_b.width as f64, scene.image_b.height as f64);
    assert!(outline
        .iter()
        .all(|p| p[0] >= 0.0 && p[1] >= 0.0 && p[0] < w && p[1] < h));
}

#[test]
fn matching_is_reproducible() {
    init_logger();
    let scene = scene();
    let settings = MatchSettings::default();
    let a = match_features(&scene.reference, &scene.target, &settings).unwrap();
    let b = match_features(&scene.reference, &scene.target, &settings).unwrap();
    assert_eq!(a.correspondences, b.correspondences);
    assert_eq!(a.inliers, b.inliers);
    assert_eq!(a.homography, b.homography);
}

#[test]
fn stricter_ratio_never_adds_correspondences() {
    let scene = scene();
    let mut previous = usize::MAX;
    for ratio in [0.95, 0.8, 0.6, 0.3, 0.05] {
        let settings = MatchSettings::default().with_ratio(ratio);
        let n = match_features(&scene.reference, &scene.target, &settings)
            .unwrap()
            .correspondences
            .len();
        assert!(n <= previous, "ratio {ratio}: {n} > {previous}");
        previous = n;
    }
}

#[test]
fn fewer_than_four_correspondences_means_no_homography() {
    let scene = scene();
    let three = scene.reference.retain({
        let mut n = 0;
        move |_| {
            n += 1;
            n <= 3
        }
    });
    assert_eq!(three.len(), 3);
    let result = match_features(&three, &scene.target, &MatchSettings::default()).unwrap();
    assert_eq!(result.correspondences.len(), 3);
    assert!(result.homography.is_none());
    assert_eq!(result.inlier_count, 0);
    assert!(result.inliers.iter().all(|&f| !f));
    assert_eq!(result.iterations, 0);
}

#[test]
fn single_identical_descriptors_do_not_match() {
    let size = ImageSize::new(10, 10);
    let row = [[0x5Au8; 32]];
    let single = |x: f64| {
        let descriptors = DescriptorMatrix::from_rows(&row).unwrap();
        FeatureSet::new(vec![Keypoint::new(x, x)], descriptors, size).unwrap()
    };
    let (a, b) = (single(1.0), single(2.0));
    let result = match_features(&a, &b, &MatchSettings::default()).unwrap();
    assert!(result.correspondences.is_empty());
    assert!(result.homography.is_none());
}

#[test]
fn importer_rejects_foreign_feature_type() {
    let json = r#"{
        "version": 1,
        "type": "AKAZE",
        "imageSize": { "width": 10, "height": 10 },
        "keypoints": [],
        "descriptors": null
    }"#;
    let err = import_features(json).unwrap_err();
    assert!(matches!(err, FeatureError::InvalidFormat(_)), "got {err:?}");
}

#[test]
fn session_walkthrough_with_settings_file() {
    init_logger();
    let scene = scene();

    let path = std::env::temp_dir().join(format!("orb-match-it-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "ratio": 0.7, "ransac_threshold": 2.0 }"#).unwrap();
    let settings = load_match_settings(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mut session = Session::new();
    session.load_image_a(scene.image_a).unwrap();
    session.set_reference(scene.reference.clone()).unwrap();
    let exported = session.export_reference().unwrap();

    // Later, in a fresh session, only the feature file is available.
    let mut later = Session::new();
    later.import_reference(&exported).unwrap();
    later.load_image_b(scene.image_b).unwrap();
    let result = later.match_target(&scene.target, &settings).unwrap();
    assert_eq!(result.inlier_count, 35);
    assert_eq!(later.state().name(), "Matched");
}
