use anyhow::Result;
use chartgen::{
    cli::{Cli, Command},
    config::Config,
    handlers,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args);

    // Load config; CLI flags take precedence over rc, .env and environment
    let mut cfg = Config::load();
    if let Some(model) = &args.model {
        cfg.set("DEFAULT_MODEL", model.clone());
    }
    if let Some(n) = args.max_retries {
        cfg.set("MAX_RETRIES", n.to_string());
    }
    if let Some(secs) = args.exec_timeout {
        cfg.set("EXEC_TIMEOUT", secs.to_string());
    }
    if let Some(dir) = &args.output_dir {
        cfg.set("OUTPUT_DIR", dir.to_string_lossy().into_owned());
    }

    match &args.command {
        Command::Run { input, id } => handlers::run::run(&cfg, input, id).await,
        Command::Batch { manifest, fail_fast } => handlers::batch::run(&cfg, manifest, *fail_fast).await,
        Command::Plan { input, md } => handlers::plan::run(&cfg, input, *md).await,
        Command::Extract { image } => handlers::extract::run(&cfg, image).await,
        Command::Init => handlers::init::run(&cfg),
    }
}

fn init_tracing(args: &Cli) {
    let default_level = if args.verbose {
        "chartgen=debug,info"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env("CHARTGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
