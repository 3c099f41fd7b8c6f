//! ITLA laser CLI: config loading, logging setup, and command dispatch.

mod cli;
mod commands;

use clap::Parser;
use eyre::WrapErr;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = cli::Cli::parse();

    let text = std::fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("failed to read config {:?}", args.config))?;
    let cfg = toml::from_str::<itla_config::Config>(&text)
        .wrap_err_with(|| format!("failed to parse config {:?}", args.config))?;
    cfg.validate().wrap_err("invalid config")?;

    init_logging(&args, &cfg.logging);
    commands::run(args, cfg)
}

fn init_logging(args: &cli::Cli, logging: &itla_config::Logging) {
    let level = logging.level.as_deref().unwrap_or(&args.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| "itla.log".as_ref());
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = cli::FILE_GUARD.set(guard);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .json()
            .init();
    } else if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
