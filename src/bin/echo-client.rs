//! Echo client demo.

use anyhow::Result;
use clap::Parser;
use portgate::{echo, logging};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive client for the echo server.
#[derive(Parser, Debug)]
#[command(name = "echo-client", version, about)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = echo::DEFAULT_ADDR)]
    server: String,

    /// Log connection details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn prompt() -> std::io::Result<()> {
    print!("Enter message (or 'quit' to exit): ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut client = echo::EchoClient::connect(args.server.as_str()).await?;
    println!("Successfully connected to server at {}", args.server);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(message) = input.next_line().await? else {
            break;
        };

        if echo::is_quit(&message) {
            println!("Sending quit signal to server...");
            client.quit().await?;
            println!("Client gracefully shutting down.");
            return Ok(());
        }

        match client.send(&message).await? {
            Some(reply) => println!("Server response: {reply}"),
            None => {
                println!("Server closed the connection unexpectedly.");
                break;
            }
        }
    }

    println!("Client gracefully shutting down.");
    Ok(())
}
