use agentplane::cli::commands::{self, RunOptions};
use agentplane::cli::output::Output;
use agentplane::cli::{Cli, Commands};
use agentplane::utils::toml_config::{AgentPlaneConfig, LogFormat};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let config = commands::load_config(&cli.config)?;
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Run {
            workflow,
            state,
            prompt,
            trace,
            timeout_secs,
        } => {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received; cancelling run");
                    trigger.cancel();
                }
            });

            let options = RunOptions {
                workflow,
                state,
                prompt,
                trace,
                timeout_secs,
            };
            commands::run(options, &config, output, cancel).await
        }
        Commands::Validate { workflow } => commands::validate(&workflow, output),
        Commands::Nodes => {
            commands::nodes(output);
            Ok(())
        }
        Commands::Config { validate } => {
            output.banner();
            commands::config(&config, &cli.config, validate, output)
        }
    }
}

fn init_tracing(config: &AgentPlaneConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("agentplane={},warn", default_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
