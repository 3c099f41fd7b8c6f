use std::sync::Arc;
use std::time::Duration;

use itla_config::calibration::{MapPoint, MapTable};
use itla_core::registers as reg;
use itla_core::{
    ItlaClient, JumpCalibration, JumpCfg, Laser, LaserCfg, SweepCfg, SweepState, Timeouts,
};
use itla_hardware::sim::{SharedDevice, SimulatedFactory};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn sim_laser() -> (Laser, SharedDevice) {
    let factory = SimulatedFactory::new(9_600);
    let state = factory.state();
    let timeouts = Timeouts {
        exchange: ms(50),
        poll: ms(1),
    };
    let client = Arc::new(ItlaClient::connect(&factory, 9_600, timeouts).expect("sim connect"));
    let map = MapTable::from_points(vec![
        MapPoint {
            freq_thz: 193.0,
            sled_temp_c: 25.0,
            filter1_temp_c: 43.0,
            filter2_temp_c: 41.0,
            filter1_power: 1.2,
            filter2_power: 1.1,
            current_ma: 100.0,
        },
        MapPoint {
            freq_thz: 195.0,
            sled_temp_c: 27.0,
            filter1_temp_c: 43.0,
            filter2_temp_c: 41.0,
            filter1_power: 1.2,
            filter2_power: 1.1,
            current_ma: 120.0,
        },
    ])
    .expect("grid");
    let cfg = LaserCfg {
        timeouts,
        jump: JumpCfg {
            pre_trigger_delay: ms(1),
            settle_deadline: ms(200),
            ready_deadline: ms(200),
            ready_poll: ms(1),
            ..JumpCfg::default()
        },
        sweep: SweepCfg {
            mode_settle_delay: ms(1),
            direction_timeout: ms(100),
            ..SweepCfg::default()
        },
        ..LaserCfg::default()
    };
    let laser = Laser::builder()
        .with_client(client)
        .with_calibration(JumpCalibration::new(map, 3.4, -0.0013))
        .with_cfg(cfg)
        .build()
        .expect("build laser");
    (laser, state)
}

#[test]
fn prepare_writes_amplitude_and_speed() {
    let (laser, state) = sim_laser();
    laser.sweep_prepare(50, 20_000).expect("prepare");
    let writes = state.lock().unwrap().writes.clone();
    assert_eq!(
        writes,
        vec![(reg::CSWEEP_AMP, 50), (reg::CSWEEP_SPEED, 20_000)]
    );
}

#[test]
fn start_enters_clean_mode_then_enables_sweep() {
    let (laser, state) = sim_laser();
    assert_eq!(laser.sweep_state(), SweepState::Stopped);
    laser.sweep_start().expect("start");
    assert_eq!(laser.sweep_state(), SweepState::Running);

    let st = state.lock().unwrap();
    assert!(st.sweep_on);
    assert_eq!(st.writes, vec![(reg::MODE, 1), (reg::CSWEEP_ON, 1)]);
}

#[test]
fn explicit_pause_rounds_and_encodes_negative_offsets() {
    let (laser, state) = sim_laser();
    laser.sweep_start().expect("start");

    let target = laser.sweep_pause(Some(-10.3)).expect("pause");
    assert_eq!(target, -10);
    assert_eq!(laser.sweep_state(), SweepState::Paused);
    // -10 GHz rides the 16-bit register as 65526.
    assert!(
        state
            .lock()
            .unwrap()
            .writes
            .contains(&(reg::CSWEEP_STOP, 65_526))
    );
}

#[test]
fn automatic_pause_extrapolates_from_two_samples() {
    let (laser, state) = sim_laser();
    laser.sweep_start().expect("start");

    // The sim advances the offset by 0.7 GHz per read: samples 0.7 and 1.4,
    // so the stop point is 1.4 + 2*0.7 = 2.8, ceiling 3.
    let target = laser.sweep_pause(None).expect("pause");
    assert_eq!(target, 3);
    assert!(state.lock().unwrap().writes.contains(&(reg::CSWEEP_STOP, 3)));
}

#[test]
fn stalled_offset_pauses_in_place_instead_of_hanging() {
    let (laser, state) = sim_laser();
    state.lock().unwrap().sweep_step_tenths = 0;
    laser.sweep_start().expect("start");

    let started = std::time::Instant::now();
    let target = laser.sweep_pause(None).expect("pause");
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "direction poll must be bounded"
    );
    assert_eq!(target, 0, "falls back to the current offset");
    assert_eq!(laser.sweep_state(), SweepState::Paused);
}

#[test]
fn resume_after_pause_and_stop_resets_the_state_machine() {
    let (laser, state) = sim_laser();
    laser.sweep_start().expect("start");
    laser.sweep_pause(Some(5.0)).expect("pause");
    assert_eq!(laser.sweep_state(), SweepState::Paused);

    laser.sweep_start().expect("resume");
    assert_eq!(laser.sweep_state(), SweepState::Running);

    laser.sweep_stop().expect("stop");
    assert_eq!(laser.sweep_state(), SweepState::Stopped);
    let st = state.lock().unwrap();
    assert!(!st.sweep_on);
    assert!(st.writes.contains(&(reg::CSWEEP_ON, 0)));
    assert!(st.writes.contains(&(reg::MODE, 0)));
}

#[test]
fn sweep_to_offset_starts_then_pauses() {
    let (laser, _state) = sim_laser();
    let target = laser.sweep_to_offset(12.0).expect("sweep to offset");
    assert_eq!(target, 12);
    assert_eq!(laser.sweep_state(), SweepState::Paused);
}
