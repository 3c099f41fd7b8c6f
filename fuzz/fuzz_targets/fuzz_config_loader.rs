#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz TOML parsing of Config and ensure it never panics and rejects
    // invalid input gracefully. Both parse errors and validation errors are
    // acceptable outcomes; panics are not.
    let parsed = toml::from_str::<itla_config::Config>(data);
    match parsed {
        Ok(cfg) => {
            // Ensure validate() does not panic
            let _ = cfg.validate();
        }
        Err(_e) => {
            // parse error is acceptable
        }
    }

    // The sled-spacing clustering must also hold up under arbitrary floats
    // smuggled in via line-shaped input.
    let temps: Vec<f64> = data
        .split_whitespace()
        .filter_map(|w| w.parse::<f64>().ok())
        .take(256)
        .collect();
    let _ = itla_config::calibration::sled_spacing(&temps);
});
