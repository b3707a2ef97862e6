//! Download every schema a device lists, then whatever they import or
//! include that the device does not list.
//!
//! # Usage
//!
//! ```bash
//! ncc-get-all-schema --host 10.0.0.1 -o ./models
//! ncc-get-all-schema --host 10.0.0.1 -o ./models --start-after Cisco-IOS-XR-ifmgr-cfg
//! ncc-get-all-schema --host 10.0.0.1 -o ./models --skip-download
//! ```

use std::path::PathBuf;

use clap::Parser;
use log::{LevelFilter, warn};

use ncc::capture::{CaptureOptions, capture_schemas};
use ncc::config::{ConnectionArgs, init_logging};
use ncc::schema::DownloadMode;

#[derive(Parser)]
#[command(
    name = "ncc-get-all-schema",
    version,
    about = "Download all schemas from a NETCONF server"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Where to write schema files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Don't get schemas until after this one
    #[arg(long, conflicts_with = "skip_download")]
    start_after: Option<String>,

    /// Skip downloading schema and just consider those downloaded already
    #[arg(long)]
    skip_download: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, LevelFilter::Warn);

    let mode = DownloadMode::from_flags(cli.start_after, cli.skip_download);
    let mut session = cli.connection.session_builder().connect().await?;

    let capture =
        capture_schemas(&mut session, &cli.output_dir, &CaptureOptions::by_name(mode)).await?;
    session.close().await?;

    for error in &capture.resolution.parse_errors {
        warn!("{}", error);
    }
    print!("{}", capture.report("", "").to_listing());
    Ok(())
}
