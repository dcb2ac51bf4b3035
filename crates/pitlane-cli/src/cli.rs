use clap::{Parser, Subcommand};

/// The `pitlane` command surface: `run` drives the eval engine end to end,
/// `report` re-validates a completed run directory, `init` bootstraps a
/// runnable starter project.
#[derive(Parser)]
#[command(name = "pitlane", version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark harness for interactive AI coding assistants")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an eval config against its configured assistants and tasks
    Run {
        /// Path to the eval config document
        config: String,

        /// Only run the task with this name
        #[arg(long = "task")]
        task: Option<String>,

        /// Comma-separated list of assistant names to include (default: all)
        #[arg(long = "assistant")]
        assistant: Option<String>,

        /// Comma-separated list of assistant names to exclude
        #[arg(long = "skip-assistant")]
        skip_assistant: Option<String>,

        /// Directory under which the run's timestamped output lands
        #[arg(long = "output-dir", default_value = "runs")]
        output_dir: String,

        /// Emit per-unit debug output to stderr in addition to the run log
        #[arg(long)]
        verbose: bool,

        /// Number of units to run concurrently (1-100)
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=100))]
        parallel: u32,

        /// Number of times to repeat each (assistant, task) unit (1-100)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
        repeat: u32,

        /// Do not open the rendered report when the run finishes
        #[arg(long = "no-open")]
        no_open: bool,
    },

    /// Re-validate a run directory and confirm its artefacts are present
    Report {
        /// Path to a run directory produced by a previous `pitlane run`
        run_dir: String,
    },

    /// Bootstrap a starter project: an `eval.yaml` plus an empty fixture
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(long = "dir", default_value = ".")]
        dir: String,

        /// Also copy a bundled example fixture pack (out of scope; documents
        /// the omission rather than silently ignoring the flag)
        #[arg(long = "with-examples")]
        with_examples: bool,
    },
}
