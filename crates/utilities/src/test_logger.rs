/// Initialises `env_logger` for tests, output is captured by the test harness.
pub fn test_logger() {
    if cfg!(not(feature = "sharc_miri")) {
        // Tests run in parallel, so the logger may already be installed.
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
