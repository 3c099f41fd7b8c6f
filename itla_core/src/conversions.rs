//! Mapping from the TOML-deserialized config (`itla_config`) into the
//! runtime config structs the client and controller consume.

use std::time::Duration;

use crate::config::{JumpCfg, LaserCfg, SweepCfg, Timeouts};

impl From<&itla_config::Timeouts> for Timeouts {
    fn from(t: &itla_config::Timeouts) -> Self {
        Self {
            exchange: Duration::from_millis(t.exchange_ms),
            poll: Duration::from_millis(t.poll_ms),
        }
    }
}

impl From<&itla_config::JumpCfg> for JumpCfg {
    fn from(j: &itla_config::JumpCfg) -> Self {
        Self {
            settle_deadline: Duration::from_millis(j.settle_deadline_ms),
            settle_tolerance_ghz: j.settle_tolerance_ghz,
            ready_deadline: Duration::from_millis(j.ready_deadline_ms),
            fallback_min_thz: j.freq_min_thz,
            fallback_max_thz: j.freq_max_thz,
            ..Self::default()
        }
    }
}

impl From<&itla_config::SweepCfg> for SweepCfg {
    fn from(s: &itla_config::SweepCfg) -> Self {
        Self {
            amplitude_ghz: s.amplitude_ghz,
            speed_mhz_per_s: s.speed_mhz_per_s,
            direction_timeout: Duration::from_millis(s.direction_timeout_ms),
            ..Self::default()
        }
    }
}

impl From<&itla_config::Config> for LaserCfg {
    fn from(c: &itla_config::Config) -> Self {
        Self {
            timeouts: (&c.timeouts).into(),
            jump: (&c.jump).into(),
            sweep: (&c.sweep).into(),
            startup: crate::config::StartupCfg::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_defaults_map_onto_runtime_defaults() {
        let toml = r#"
[connection]
port = "COM12"
baud = 115200
"#;
        let cfg = itla_config::load_toml(toml).expect("parse");
        let runtime: LaserCfg = (&cfg).into();
        assert_eq!(runtime.timeouts.exchange, Duration::from_millis(250));
        assert_eq!(runtime.jump.settle_tolerance_ghz, 0.1);
        assert_eq!(runtime.jump.fallback_max_thz, 196.25);
        assert_eq!(runtime.sweep.amplitude_ghz, 50);
    }
}
