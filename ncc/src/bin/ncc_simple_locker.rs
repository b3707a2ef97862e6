//! Hold a lock on a datastore for a while, or release one.
//!
//! # Usage
//!
//! ```bash
//! ncc-simple-locker --host 10.0.0.1 --target candidate --time 30
//! ncc-simple-locker --host 10.0.0.1 --unlock
//! ```

use std::time::Duration;

use clap::Parser;
use log::LevelFilter;

use ncc::config::{ConnectionArgs, init_logging};
use ncc::netconf::Datastore;

#[derive(Parser)]
#[command(
    name = "ncc-simple-locker",
    version,
    about = "Lock or unlock a NETCONF datastore"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Instead of locking, unlock the target datastore
    #[arg(long)]
    unlock: bool,

    /// Datastore to lock
    #[arg(long, default_value = "running")]
    target: Datastore,

    /// Seconds to hold the lock
    #[arg(long, default_value_t = 10)]
    time: u64,

    /// Hold the lock in a scope that always unlocks
    #[arg(long)]
    context: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, LevelFilter::Warn);

    let target = cli.target;
    let hold = Duration::from_secs(cli.time);
    let mut session = cli.connection.session_builder().connect().await?;

    if cli.unlock {
        session.unlock(target).await?;
        println!("Unlocked {}", target);
    } else if cli.context {
        session
            .locked(target, |_session| {
                Box::pin(async move {
                    println!("Locked {}", target);
                    tokio::time::sleep(hold).await;
                    Ok(())
                })
            })
            .await?;
        println!("Unlocked {}", target);
    } else {
        session.lock(target).await?;
        println!("Locked {}", target);
        println!("Sleeping with lock for {} seconds...", cli.time);
        tokio::time::sleep(hold).await;
        session.unlock(target).await?;
        println!("Unlocked {}", target);
    }

    session.close().await?;
    Ok(())
}
