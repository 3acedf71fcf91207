use clap::Parser;
use colsort::cli::{Cli, run};

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(error) = run(cli) {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}
