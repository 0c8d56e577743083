use clap::Parser;
use heft::cli::Cli;
use std::process;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    if let Err(e) = heft::run_command(cli.command) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
