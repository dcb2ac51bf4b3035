use anyhow::Result;
use clap::Parser;
use pitlane_orchestrator::{RunLogLayer, UnitLogLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod init_cmd;
mod report_cmd;
mod run_cmd;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(&cli.command, Commands::Run { verbose: true, .. });

    let unit_log_layer = UnitLogLayer::new();
    let run_log_layer = RunLogLayer::new();

    // The run logger always writes `<run>/debug.log`; it additionally tees
    // to stderr only when `--verbose` was passed.
    let stderr_layer = verbose.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(stderr_layer)
        .with(unit_log_layer.clone())
        .with(run_log_layer.clone())
        .try_init()
        .ok();

    let exit_code = match cli.command {
        Commands::Run { config, task, assistant, skip_assistant, output_dir, verbose, parallel, repeat, no_open: _ } => {
            run_cmd::handle_run(config, task, assistant, skip_assistant, output_dir, verbose, parallel, repeat, &unit_log_layer, &run_log_layer)
                .await?
        }
        Commands::Report { run_dir } => {
            report_cmd::handle_report(&run_dir)?;
            0
        }
        Commands::Init { dir, with_examples } => {
            init_cmd::handle_init(&dir, with_examples)?;
            0
        }
    };

    std::process::exit(exit_code);
}
