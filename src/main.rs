use clap::Parser;
use ladderquant::cli::{run, Cli};
use log::LevelFilter;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let crate_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter(None, LevelFilter::Warn)
        .filter(Some("ladderquant"), crate_level)
        .parse_env("RUST_LOG")
        .init();

    run(cli)
}
