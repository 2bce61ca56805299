//! Echo server demo.

use anyhow::Result;
use clap::Parser;
use portgate::{echo, logging};
use tracing::info;

/// Line-oriented echo server, one client at a time.
#[derive(Parser, Debug)]
#[command(name = "echo-server", version, about)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = echo::DEFAULT_ADDR)]
    listen: String,

    /// Log each message to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let listener = echo::bind(&args.listen).await?;
    println!("Server is listening on {}...", listener.local_addr()?);

    echo::serve(listener, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await?;

    Ok(())
}
