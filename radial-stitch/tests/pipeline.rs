use image::{imageops, Rgb, RgbImage};
use radial_stitch::{
    CorrespondenceProvider, Correspondences, FallbackPolicy, Keypoint, Match, OrbFeatureConfig, StitchError,
    StitchResult, StitcherBuilder, Translation,
};
use radial_warp::build_blend_mask;
use std::cell::Cell;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Reports a fixed translation per pair through a small set of agreeing matches
struct FixedShift {
    shifts: Vec<(f32, f32)>,
    call: Cell<usize>,
}

impl FixedShift {
    fn new(shifts: &[(f32, f32)]) -> Self {
        Self { shifts: shifts.to_vec(), call: Cell::new(0) }
    }
}

impl CorrespondenceProvider for FixedShift {
    fn correspond(&self, _current: &RgbImage, _previous: &RgbImage) -> StitchResult<Correspondences> {
        let n = self.call.get();
        self.call.set(n + 1);
        let (dx, dy) = self.shifts[n];
        let keypoints_a: Vec<Keypoint> = (0..8).map(|k| Keypoint::new(2.0 + 2.0 * k as f32, 3.0 + k as f32)).collect();
        let keypoints_b = keypoints_a.iter().map(|p| Keypoint::new(p.x + dx, p.y + dy)).collect();
        let matches = (0..8).map(|k| Match::new(k, k, 5.0 + k as f32)).collect();
        Ok(Correspondences { keypoints_a, keypoints_b, matches })
    }
}

fn weighted(new: [u8; 3], a_new: f64, old: [u8; 3], a_old: f64) -> [u8; 3] {
    let w = a_new + a_old;
    if w <= 0.0 {
        return old;
    }
    let mut out = [0u8; 3];
    for c in 0..3 {
        out[c] = ((a_new * new[c] as f64 + a_old * old[c] as f64) / w) as u8;
    }
    out
}

#[test]
fn solid_blocks_blend_only_where_they_overlap() {
    init_logging();

    let colours = [[200u8, 40, 40], [40, 200, 40], [60, 60, 220]];
    let frames: Vec<RgbImage> = colours.iter().map(|&c| RgbImage::from_pixel(40, 20, Rgb(c))).collect();

    let stitcher = StitcherBuilder::new()
        .focal_length(1.0e6)
        .exhaustive_trials()
        .fallback(FallbackPolicy::NoConsensus)
        .threads(1)
        .build_with_provider(FixedShift::new(&[(20.0, 0.0), (20.0, 0.0)]))
        .unwrap();
    let pano = stitcher.stitch(&frames).unwrap();

    assert_eq!(pano.canvas.dimensions(), (80, 24));
    assert_eq!(pano.transforms[0].translation(), Translation::new(0.0, 2.0));
    assert_eq!(pano.transforms[1].translation(), Translation::new(20.0, 2.0));
    assert_eq!(pano.transforms[2].translation(), Translation::new(40.0, 2.0));
    for reg in &pano.registrations {
        assert_eq!(reg.good_matches.len(), 8);
        assert_eq!(reg.estimate.consensus, 7);
    }

    let mask = build_blend_mask(40, 20);
    let m = |x: u32, y: u32| mask.get_pixel(x, y).0[0];

    for y in 0..24u32 {
        for x in 0..80u32 {
            let got = pano.canvas.get_pixel(x, y).0;
            if !(2..22).contains(&y) {
                assert_eq!(got, [0, 0, 0], "({}, {})", x, y);
                continue;
            }
            let ly = y - 2;
            let expected = match x {
                0..=19 => colours[0],
                20..=39 => weighted(colours[1], m(x - 20, ly), colours[0], m(x, ly)),
                40..=59 => weighted(colours[2], m(x - 40, ly), colours[1], m(x - 20, ly)),
                _ => colours[2],
            };
            assert_eq!(got, expected, "({}, {})", x, y);
        }
    }
}

#[test]
fn missing_overlap_is_reported_distinctly() {
    init_logging();

    struct Nothing;
    impl CorrespondenceProvider for Nothing {
        fn correspond(&self, _c: &RgbImage, _p: &RgbImage) -> StitchResult<Correspondences> {
            Ok(Correspondences::default())
        }
    }

    let frames = vec![RgbImage::from_pixel(30, 20, Rgb([9, 9, 9])); 3];
    let err = StitcherBuilder::new()
        .build_with_provider(Nothing)
        .unwrap()
        .stitch(&frames)
        .unwrap_err();
    assert!(err.is_insufficient_overlap());
    assert!(err.to_string().contains("do not overlap"));
    assert!(matches!(err, StitchError::InsufficientCorrespondences { frame: Some(1), .. }));
}

/// Deterministic per-pixel noise in world coordinates
fn scene(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let h = (x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263)).wrapping_mul(2_246_822_519);
        let v = (h >> 24) as u8;
        Rgb([v, v, v])
    })
}

#[test]
fn orb_features_register_shifted_crops() {
    init_logging();

    let world = scene(160, 64);
    let frames: Vec<RgbImage> = [0u32, 30, 60]
        .iter()
        .map(|&x0| imageops::crop_imm(&world, x0, 0, 100, 64).to_image())
        .collect();

    let stitcher = StitcherBuilder::new()
        .focal_length(1.0e6)
        .exhaustive_trials()
        .fallback(FallbackPolicy::NoConsensus)
        .features(OrbFeatureConfig { patch_size: 15, ..OrbFeatureConfig::default() })
        .build()
        .unwrap();
    let pano = stitcher.stitch(&frames).unwrap();

    // 100 + 2 * 50 wide, 1.2 * 64 = 76.8 high
    assert_eq!(pano.canvas.dimensions(), (200, 76));
    let origin = pano.transforms[0].translation();
    assert_eq!(origin, Translation::new(0.0, 6.0));
    assert_eq!(pano.transforms[1].translation(), Translation::new(30.0, 6.0));
    assert_eq!(pano.transforms[2].translation(), Translation::new(60.0, 6.0));

    // Left of the first overlap only frame 0 contributes
    for y in 0..64 {
        for x in 0..30 {
            assert_eq!(pano.canvas.get_pixel(x, y + 6), world.get_pixel(x, y));
        }
    }
}
