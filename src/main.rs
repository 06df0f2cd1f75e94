use clap::Parser;
use mltrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
