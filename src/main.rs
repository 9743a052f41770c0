use clap::Parser;
use console::style;
use ionapi_probe::{
    cli::Cli,
    config::Config,
    error::ExitCode,
    logging,
    output::{get_formatter, write_output},
    runner::{Runner, RunnerConfig},
};
use std::process::ExitCode as StdExitCode;

#[tokio::main]
async fn main() -> StdExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                StdExitCode::from(ExitCode::Fatal as u8)
            } else {
                StdExitCode::SUCCESS
            };
        }
    };

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            e.exit_code()
        }
    };

    StdExitCode::from(exit_code as u8)
}

async fn run(cli: Cli) -> ionapi_probe::Result<ExitCode> {
    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default_config()
    };

    // Environment first, then command line
    config.apply_env_overrides()?;
    if let Some(log_file) = &cli.log_file {
        config.global.log_file = log_file.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.global.request_timeout_seconds = timeout;
    }
    if let Some(output) = cli.output.clone() {
        config.global.output_format = output.into();
    }
    config.validate()?;

    logging::init(&config.global.log_file, cli.debug)?;

    let runner_config = RunnerConfig::from_config(
        &config,
        cli.credential_file.clone(),
        cli.debug,
        cli.tenant_probes(),
    );
    let report = Runner::new(runner_config).run().await;

    let formatter = get_formatter(config.global.output_format, console::colors_enabled());
    write_output(&formatter.format(&report))?;

    if let Some(failure) = &report.failure {
        eprintln!("{} {}", style("Error:").red().bold(), failure.message);
    }

    Ok(report.exit_code())
}
