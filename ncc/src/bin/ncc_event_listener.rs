//! Subscribe to an RFC 5277 event stream and print every notification
//! until the session ends.
//!
//! # Usage
//!
//! ```bash
//! ncc-event-listener --host 10.0.0.1 --stream NETCONF
//! ```

use std::pin::pin;

use clap::Parser;
use futures_util::StreamExt;
use log::{LevelFilter, info};

use ncc::config::{ConnectionArgs, init_logging};

#[derive(Parser)]
#[command(
    name = "ncc-event-listener",
    version,
    about = "Print notifications from a NETCONF event stream"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Event stream to register on
    #[arg(long)]
    stream: String,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, LevelFilter::Warn);

    let mut session = cli.connection.session_builder().connect().await?;
    session
        .create_subscription(Some(cli.stream.as_str()), None, None, None)
        .await?;
    info!("Subscribed to {}", cli.stream);

    let mut notifications = pin!(session.notifications());
    while let Some(notification) = notifications.next().await {
        let notification = notification?;
        println!("----");
        println!("{}", notification.xml());
    }
    info!("Session closed");
    Ok(())
}
