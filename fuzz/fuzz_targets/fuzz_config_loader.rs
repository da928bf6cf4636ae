#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject anything, but must never panic.
    let Ok(cfg) = toml::from_str::<bimorph_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // a config that validates must also satisfy the core's own checks
        let settings = bimorph_core::MoveSettings::from(&cfg);
        assert!(settings.validate().is_ok(), "core rejected a valid config: {cfg:?}");
    }
});
