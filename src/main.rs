//! CLI entry point for photo mosaic rendering

use clap::Parser;
use log::LevelFilter;
use tessellate::io::cli::{Cli, MosaicRunner};

fn main() -> tessellate::Result<()> {
    let cli = Cli::parse();
    let level = if cli.should_show_progress() {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut runner = MosaicRunner::new(cli);
    runner.run()
}
