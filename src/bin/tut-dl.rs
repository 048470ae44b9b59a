use std::env;
use std::process::ExitCode;

use tut_dl::Error;
use tut_dl::cli::{self, print_usage};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match cli::parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::MissingParameter(_)) => {
            eprintln!("Error: {e}");
            eprintln!();
            print_usage();
            ExitCode::FAILURE
        }
        Err(Error::Cancelled) => {
            eprintln!("Cancelled.");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
