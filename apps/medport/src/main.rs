//! # MedPort
//!
//! Medication tracker server and command line client.
//!
//! ```text
//! medport serve [--bind ADDR] [--backend memory|redb] [--db FILE] [--api-key KEY]
//! medport submit <FILE> [--url URL]
//! medport connect [--url URL]
//! medport validate <FILE>
//! medport template
//! medport color <#rrggbb | r,g,b>
//! ```

use clap::Parser;
use medport::cli;
use medport::config::{Cli, Commands};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "medport=debug,medport_client=debug,tower_http=debug"
    } else {
        "medport=info,medport_client=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Serve(config) => cli::cmd_serve(&config).await,
        Commands::Submit { file, client } => cli::cmd_submit(&file, &client).await,
        Commands::Connect { client } => cli::cmd_connect(&client).await.map(|_| ()),
        Commands::Validate { file } => cli::cmd_validate(&file),
        Commands::Template => cli::cmd_template().map(|json| println!("{}", json)),
        Commands::Color { value } => cli::cmd_color(&value).map(|converted| println!("{}", converted)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
