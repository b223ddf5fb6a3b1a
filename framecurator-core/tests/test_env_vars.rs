use framecurator_core::config::CuratorConfig;
use std::env;

// Kept as the only test in this binary: environment variables are process-wide.
#[test]
fn test_env_var_overrides() {
    unsafe {
        env::set_var("FRAMECURATOR_SMALL_INTERVAL", "5");
        env::set_var("FRAMECURATOR_SIMILARITY_THRESHOLD", "0.9");
        env::set_var("FRAMECURATOR_MAX_FRAMES_PER_VIDEO", "40");
        env::set_var("FRAMECURATOR_DETECT_MOTION", "false");
        env::set_var("FRAMECURATOR_SEED", "1234");
        env::set_var("FRAMECURATOR_MIN_SHARPNESS", "not-a-number");
    }

    let config = CuratorConfig::default();

    assert_eq!(config.sampling.small_interval, 5);
    assert_eq!(config.dedup.similarity_threshold, 0.9);
    assert_eq!(config.sampling.max_frames_per_video, Some(40));
    assert!(!config.quality.detect_motion);
    assert_eq!(config.seed, Some(1234));
    // Unparsable values fall back to the default.
    assert_eq!(config.quality.min_sharpness, 100.0);

    unsafe {
        env::remove_var("FRAMECURATOR_SMALL_INTERVAL");
        env::remove_var("FRAMECURATOR_SIMILARITY_THRESHOLD");
        env::remove_var("FRAMECURATOR_MAX_FRAMES_PER_VIDEO");
        env::remove_var("FRAMECURATOR_DETECT_MOTION");
        env::remove_var("FRAMECURATOR_SEED");
        env::remove_var("FRAMECURATOR_MIN_SHARPNESS");
    }
}
