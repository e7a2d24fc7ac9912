use anyhow::Result;
use clap::Parser;
use pullstream::{
    app,
    cli::{handle_config_command, tone_request, Cli, CliCommand, ToneCliArgs},
    config::Config,
};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::from(app::exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(CliCommand::Version) = cli.command {
        println!("pullstream {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load()?;
    cli.apply_overrides(&mut config);

    let request = match &cli.command {
        Some(CliCommand::Config) => return handle_config_command(&config),
        Some(command) => match command.playback_request(&config) {
            Some(request) => request,
            None => return Ok(()),
        },
        None => tone_request(&ToneCliArgs::default(), &config),
    };

    app::run_playback(request, &config)?;
    Ok(())
}
