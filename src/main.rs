mod cli;
mod execute;

use clap::Parser;
use colored::Colorize;
use modcache::util::ExitCodeError;
use crate::cli::CLI;

fn main() {
    let cli = CLI::parse();
    if let Err(err) = execute::execute(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        // Failed collaborators pass their own exit code through.
        let code = err
            .downcast_ref::<ExitCodeError>()
            .map(|e| e.code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
