use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use upsetter_cli::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    Builder::new()
        .filter_level(cli.log_level())
        .parse_env(Env::default())
        .init();
    cli.run()
}
