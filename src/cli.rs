use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "chartgen", about = "Design, generate and render charts from dataset descriptions", version)]
pub struct Cli {
    /// Large language model to use.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Maximum number of code candidates per chart.
    #[arg(long = "max-retries", global = true)]
    pub max_retries: Option<u32>,

    /// Seconds a generated script may run before it is killed.
    #[arg(long = "exec-timeout", global = true)]
    pub exec_timeout: Option<u64>,

    /// Root directory for per-chart artifacts.
    #[arg(long = "output-dir", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Log debug output (state transitions, script output).
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Plan, generate and render one chart.
    Run {
        #[command(flatten)]
        input: DatasetArgs,

        /// Request id used to name the artifact directory and files.
        #[arg(long)]
        id: String,
    },

    /// Process every request in a JSON manifest.
    Batch {
        /// Manifest file: {"requests": [{"name", "dataset" | "dataset_path", "factors", "variants"}]}
        manifest: PathBuf,

        /// Stop at the first request that errors.
        #[arg(long = "fail-fast")]
        fail_fast: bool,
    },

    /// Print a design plan without generating code.
    Plan {
        #[command(flatten)]
        input: DatasetArgs,

        /// Render the plan as Markdown.
        #[arg(long)]
        md: bool,
    },

    /// Extract the underlying data from a chart image.
    Extract {
        #[arg(long)]
        image: PathBuf,
    },

    /// Write the built-in persona prompts to the prompts directory.
    Init,
}

#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Dataset description file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    pub dataset: String,

    /// Design factor to plan for.
    #[arg(long)]
    pub factor: u32,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
