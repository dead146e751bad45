mod bundle;
mod commands;
mod config;
mod error;
mod logger;
mod progress;
mod provision;
mod runner;
mod writer;
use crate::commands::Commands;
use crate::logger::Logger;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use clap::Parser;

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    name = "storefront",
    version,
    about = "Declare, synthesize and deploy the storefront stacks",
    long_about = "Manages the storefront's infrastructure: a storage stack with one table per domain, and a CRUD service stack (REST API and handlers) per domain."
)]
struct Cli {
    /// Output structured JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    /// Show logs, `-vv` for debug logs and `-vvv` for the AWS SDK's too
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Derive a runner from the command and run it
async fn run(command: impl Runnable, writer: &Writer) {
    if let Err(error) = command.runner(writer).run().await {
        eprintln!("\n{}\n{error}", console::style("Error").red().bold());
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    Logger::init(cli.verbose);

    let writer = Writer::new(cli.json);

    // Match all commands here, in one place
    match cli.command {
        Commands::Synth(cmd) => run(cmd, &writer).await,
        Commands::Deploy(cmd) => run(cmd, &writer).await,
        Commands::Destroy(cmd) => run(cmd, &writer).await,
        Commands::Status(cmd) => run(cmd, &writer).await,
        Commands::Routes(cmd) => run(cmd, &writer).await,
        Commands::Validate(cmd) => run(cmd, &writer).await,
    }

    Ok(())
}
