//! Detect (synthetically) in a region of image A, save the feature file,
//! then find the region in a warped image B.
//!
//! Run with `RUST_LOG=debug` to see the matcher's log output.

use orb_match::{
    match_features, DescriptorMatrix, FeatureDocument, FeatureSet, Homography, ImageSize,
    Keypoint, MatchSettings, Roi, Session,
};
use rand::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(7);

    let image_a = ImageSize::new(1280, 720);
    let image_b = ImageSize::new(1024, 768);
    let roi = Roi::new(400, 200, 320, 240);
    let warp = Homography::from_row_major([0.85, 0.05, 60.0, -0.04, 0.9, 90.0, 1e-4, 5e-5, 1.0]);

    // "Detected" features in A: random positions and descriptors.
    let mut keypoints = Vec::new();
    let mut rows = Vec::new();
    for _ in 0..300 {
        keypoints.push(
            Keypoint::new(rng.gen_range(0.0..1280.0), rng.gen_range(0.0..720.0))
                .with_size(31.0)
                .with_response(rng.gen_range(0.0..0.01)),
        );
        let mut d = [0u8; 32];
        rng.fill(&mut d[..]);
        rows.push(d);
    }
    let descriptors = DescriptorMatrix::from_rows(&rows)?;
    let detected = FeatureSet::new(keypoints.clone(), descriptors, image_a)?;

    let mut session = Session::new();
    session.load_image_a(image_a)?;
    session.set_reference(detected.crop(&roi)?)?;

    let path = std::env::temp_dir().join("orb-match-demo.json");
    FeatureDocument::from_feature_set(session.reference().ok_or("no reference")?)?
        .write_to_path(&path)?;
    println!("wrote {}", path.display());

    // Image B sees the same scene through `warp`, with a little descriptor noise.
    let mut kps_b = Vec::new();
    let mut rows_b = Vec::new();
    for (kp, row) in keypoints.iter().zip(&rows) {
        let Some([x, y]) = warp.project([kp.x, kp.y]) else {
            continue;
        };
        if x < 0.0 || y < 0.0 || x >= image_b.width as f64 || y >= image_b.height as f64 {
            continue;
        }
        let mut d = *row;
        d[rng.gen_range(0..32usize)] ^= 1 << rng.gen_range(0..8u32);
        kps_b.push(Keypoint::new(x, y).with_size(31.0));
        rows_b.push(d);
    }
    let target = FeatureSet::new(kps_b, DescriptorMatrix::from_rows(&rows_b)?, image_b)?;

    let reference = FeatureDocument::read_from_path(&path)?.into_feature_set()?;
    let result = match_features(&reference, &target, &MatchSettings::default())?;
    println!(
        "{} correspondences, {} inliers ({:.0}%) after {} iterations",
        result.correspondences.len(),
        result.inlier_count,
        100.0 * result.inlier_ratio(),
        result.iterations
    );
    match result.project_roi(&Roi::full(reference.image_size())) {
        Some(corners) => {
            println!("region found in B at:");
            for [x, y] in corners {
                println!("  ({x:.1}, {y:.1})");
            }
        }
        None => println!("region not found"),
    }

    std::fs::remove_file(&path).ok();
    Ok(())
}
