use std::fs::File;
use std::io::{self, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use simple_database::{cli::Cli, session::Session};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    // Replies go to stdout, so diagnostics stay on stderr and default to quiet.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut session = Session::new();
    let stdout = io::stdout().lock();

    let stats = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input file {}", path.display()))?;
            session.run(BufReader::new(file), stdout, cli.prompt())?
        }
        None => session.run(io::stdin().lock(), stdout, cli.prompt())?,
    };
    debug!(?stats, "exiting");

    Ok(())
}
