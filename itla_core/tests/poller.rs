use std::sync::Arc;
use std::time::Duration;

use itla_config::calibration::{MapPoint, MapTable};
use itla_core::{ItlaClient, JumpCalibration, Laser, LaserCfg, StatusPoller, Timeouts};
use itla_hardware::sim::SimulatedFactory;

fn sim_laser() -> Arc<Laser> {
    let factory = SimulatedFactory::new(9_600);
    let timeouts = Timeouts {
        exchange: Duration::from_millis(50),
        poll: Duration::from_millis(1),
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
    Arc::new(
        Laser::builder()
            .with_client(client)
            .with_calibration(JumpCalibration::new(map, 3.4, -0.0013))
            .with_cfg(LaserCfg {
                timeouts,
                ..LaserCfg::default()
            })
            .build()
            .expect("build laser"),
    )
}

#[test]
fn poller_delivers_snapshots_and_shuts_down() {
    let laser = sim_laser();
    let poller = StatusPoller::spawn(laser.clone(), Duration::from_millis(5));

    let mut snapshot = None;
    for _ in 0..100 {
        if let Some(s) = poller.latest() {
            snapshot = Some(s);
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    let snapshot = snapshot.expect("poller must deliver a snapshot");
    assert_eq!(snapshot.frequency_thz, 193.0);
    assert_eq!(snapshot.power_dbm, 0.0, "output not enabled yet");

    assert!(poller.stalled_for() < 5_000);
    drop(poller); // must join without hanging
}

#[test]
fn poller_exits_when_client_disconnects() {
    let laser = sim_laser();
    let poller = StatusPoller::spawn(laser.clone(), Duration::from_millis(5));
    std::thread::sleep(Duration::from_millis(20));

    laser.client().disconnect();
    std::thread::sleep(Duration::from_millis(30));
    // Dropping after the thread has already exited must not deadlock.
    drop(poller);
}
