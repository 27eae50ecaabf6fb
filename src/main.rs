/// Predbench - Load generator for HTTP prediction endpoints.
///
/// A fast CLI tool that spawns simulated users against a prediction API.
mod cli;
mod error;
mod http;
mod simulator;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
