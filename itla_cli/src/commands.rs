//! Command implementations: device assembly and the operation surface.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use itla_config::Config;
use itla_core::{
    ItlaClient, JumpCalibration, Laser, LaserCfg, LaserStatus, StatusPoller, Timeouts, registers,
};
use itla_hardware::SimulatedFactory;
use itla_traits::TransportFactory;

use crate::cli::{Cli, Commands, SweepCommands};

pub fn run(args: Cli, cfg: Config) -> eyre::Result<()> {
    if matches!(args.cmd, Commands::Regs) {
        return print_registers(args.json);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupted.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .wrap_err("failed to install ctrl-c handler")?;
    }

    let factory: Box<dyn TransportFactory> = if args.sim {
        Box::new(SimulatedFactory::new(cfg.connection.baud))
    } else {
        Box::new(itla_hardware::SerialFactory::new(cfg.connection.port.clone()))
    };

    let timeouts: Timeouts = (&cfg.timeouts).into();
    let client = Arc::new(
        ItlaClient::connect(factory.as_ref(), cfg.connection.baud, timeouts)
            .wrap_err_with(|| format!("cannot connect on {}", cfg.connection.port))?,
    );
    tracing::info!(port = %cfg.connection.port, sim = args.sim, "connected");

    let calibration = match (&cfg.files.sled, &cfg.files.map) {
        (Some(sled), Some(map)) => Some(
            JumpCalibration::from_files(&client, Path::new(sled), Path::new(map))
                .wrap_err("failed to load jump calibration")?,
        ),
        _ => None,
    };

    let laser_cfg: LaserCfg = (&cfg).into();
    let mut builder = Laser::builder()
        .with_client(client.clone())
        .with_cfg(laser_cfg);
    if let Some(cal) = calibration {
        builder = builder.with_calibration(cal);
    }
    let abort_flag = interrupted.clone();
    let laser = Arc::new(
        builder
            .with_abort_check(move || abort_flag.load(Ordering::SeqCst))
            .build()?,
    );

    let result = dispatch(&args, &cfg, &laser, &interrupted);
    client.disconnect();
    result
}

fn dispatch(
    args: &Cli,
    cfg: &Config,
    laser: &Arc<Laser>,
    interrupted: &AtomicBool,
) -> eyre::Result<()> {
    match &args.cmd {
        Commands::Status => {
            print_status(&laser.status(), args.json);
        }
        Commands::Id => {
            let (mfgr, model, serial) = (
                laser.manufacturer()?,
                laser.model()?,
                laser.serial_number()?,
            );
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "manufacturer": mfgr,
                        "model": model,
                        "serial": serial,
                    })
                );
            } else {
                println!("{mfgr} {model} (s/n {serial})");
            }
        }
        Commands::On { freq } => {
            laser.laser_on(*freq)?;
            println!("laser on at {freq} THz, {:.2} dBm", laser.check_power());
        }
        Commands::Off => {
            laser.laser_off()?;
            println!("laser off");
        }
        Commands::Jump { freq } => {
            let outcome = laser.clean_jump(*freq)?;
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "target_thz": outcome.target_thz,
                        "reported_thz": outcome.reported_thz,
                        "residual_ghz": outcome.residual_ghz,
                        "settled": outcome.settled,
                        "ready": outcome.ready,
                    })
                );
            } else {
                println!(
                    "jumped to {:.4} THz (device reports {:.4} THz, residual {:.1} GHz{})",
                    outcome.target_thz,
                    outcome.reported_thz,
                    outcome.residual_ghz,
                    if outcome.settled { "" } else { ", NOT settled" },
                );
            }
        }
        Commands::Sweep { cmd } => run_sweep(cmd, cfg, laser)?,
        Commands::Monitor => {
            let period = Duration::from_millis(cfg.poller.period_ms);
            let poller = StatusPoller::spawn(laser.clone(), period);
            println!("monitoring; ctrl-c to stop");
            while !interrupted.load(Ordering::SeqCst) {
                if let Some(s) = poller.latest() {
                    print_status(&s, args.json);
                }
                std::thread::sleep(period);
            }
        }
        Commands::Regs => unreachable!("handled before connecting"),
    }
    Ok(())
}

fn run_sweep(cmd: &SweepCommands, cfg: &Config, laser: &Laser) -> eyre::Result<()> {
    match cmd {
        SweepCommands::Start { amplitude, speed } => {
            let amplitude = amplitude.unwrap_or(cfg.sweep.amplitude_ghz);
            let speed = speed.unwrap_or(cfg.sweep.speed_mhz_per_s);
            laser.sweep_prepare(amplitude, speed)?;
            laser.sweep_start()?;
            println!("sweeping ±{} GHz at {} MHz/s", amplitude / 2, speed);
        }
        SweepCommands::Pause { offset } => {
            let target = laser.sweep_pause(*offset)?;
            println!("pausing sweep at {target} GHz");
        }
        SweepCommands::Stop => {
            laser.sweep_stop()?;
            println!("sweep stopped");
        }
        SweepCommands::To { offset } => {
            let target = laser.sweep_to_offset(*offset)?;
            println!("sweeping to {target} GHz offset");
        }
    }
    Ok(())
}

fn print_status(status: &LaserStatus, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "power_dbm": status.power_dbm,
                "frequency_thz": status.frequency_thz,
                "offset_ghz": status.offset_ghz,
            })
        );
    } else {
        println!(
            "power {:6.2} dBm | frequency {:9.4} THz | offset {:+6.1} GHz",
            status.power_dbm, status.frequency_thz, status.offset_ghz
        );
    }
}

fn print_registers(json: bool) -> eyre::Result<()> {
    if json {
        let rows: Vec<_> = registers::REGISTERS
            .iter()
            .map(|r| {
                serde_json::json!({
                    "address": r.address,
                    "name": r.name,
                    "access": format!("{:?}", r.access),
                    "unit": r.unit,
                })
            })
            .collect();
        println!("{}", serde_json::json!(rows));
    } else {
        for r in registers::REGISTERS {
            println!("{:#04x}  {:<12} {:<10} {}", r.address, r.name, format!("{:?}", r.access), r.unit);
        }
    }
    Ok(())
}
