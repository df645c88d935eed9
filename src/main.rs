use clap::Parser;
use tracing_subscriber::EnvFilter;

use hts_codecs::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("hts_codecs=debug,info")
    } else {
        EnvFilter::new("hts_codecs=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Detect(args) => {
            cli::detect::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Bundle(args) => {
            cli::bundle::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
