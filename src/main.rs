use clap::{CommandFactory, Parser};
use std::process;
use tabload::LoaderError;
use tabload::cli::{args::Args, commands};

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help
    if args.command.is_none() {
        if let Err(e) = Args::command().print_help() {
            eprintln!("Failed to print help: {}", e);
            process::exit(1);
        }
        println!();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    eprintln!("\nReceived CTRL+C, shutting down...");
                    Err(LoaderError::Interrupted {
                        reason: "Run interrupted by user".to_string(),
                    }
                    .into())
                }
                Err(e) => Err(anyhow::Error::new(e)
                    .context("Failed to install CTRL+C signal handler")),
            },
        }
    });

    match result {
        Ok(true) => process::exit(0),
        // Per-task failures have already been reported in the summary
        Ok(false) => process::exit(1),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
