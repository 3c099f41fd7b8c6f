use itla_config::load_toml;

#[test]
fn minimal_config_validates() {
    let toml = r#"
[connection]
port = "/dev/ttyUSB0"
baud = 9600
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("defaults should validate");
    assert_eq!(cfg.timeouts.exchange_ms, 250);
    assert_eq!(cfg.jump.freq_min_thz, 191.5);
    assert_eq!(cfg.jump.freq_max_thz, 196.25);
}

#[test]
fn rejects_unknown_baud_rate() {
    let toml = r#"
[connection]
port = "/dev/ttyUSB0"
baud = 7200
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject baud=7200");
    assert!(format!("{err}").contains("connection.baud"));
}

#[test]
fn rejects_zero_exchange_timeout() {
    let toml = r#"
[connection]
port = "COM12"
baud = 115200

[timeouts]
exchange_ms = 0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject exchange_ms=0");
    assert!(format!("{err}").contains("timeouts.exchange_ms must be >= 1"));
}

#[test]
fn rejects_inverted_frequency_range() {
    let toml = r#"
[connection]
port = "COM12"
baud = 115200

[jump]
freq_min_thz = 196.5
freq_max_thz = 191.5
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject inverted range");
    assert!(format!("{err}").contains("freq_min_thz"));
}

#[test]
fn rejects_oversized_sweep_amplitude() {
    let toml = r#"
[connection]
port = "COM12"
baud = 115200

[sweep]
amplitude_ghz = 80
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject amplitude > 50 GHz");
    assert!(format!("{err}").contains("sweep.amplitude_ghz"));
}
