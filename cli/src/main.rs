mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::DaemonClient;
use shared::{Command, Response};

#[derive(Parser)]
#[command(name = "voxshock")]
#[command(about = "CLI tool for the voxshock voice command daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start listening for the wake phrase
    Start,
    /// Stop listening
    Stop,
    /// Show daemon state, audio level and arming state
    Status,
    /// Fire a low-intensity test command through the dispatch gate
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::new();

    let command = match cli.command {
        Commands::Start => Command::Start,
        Commands::Stop => Command::Stop,
        Commands::Status => Command::Status,
        Commands::Test => Command::Test,
    };

    match client.send_command(command).await {
        Ok(Response::Ok) => {
            println!("Success");
        }
        Ok(Response::Status(info)) => {
            println!("Status:");
            println!("  Running: {}", info.is_running);
            println!("  Listening: {}", info.is_listening);
            println!("  Audio level: {:.2}", info.audio_level);
            println!("  Arbiter: {}", info.arbiter);
            println!("  Wake phrase: {}", info.wake_word);
        }
        Ok(Response::Error(msg)) => {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to connect to voxshockd: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
