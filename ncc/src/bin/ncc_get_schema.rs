//! Download one schema to stdout, or with `--get-depends` into a
//! directory together with everything it imports or includes.
//!
//! # Usage
//!
//! ```bash
//! ncc-get-schema --host 10.0.0.1 --schema Cisco-IOS-XR-ifmgr-cfg
//! ncc-get-schema --host 10.0.0.1 --schema openconfig-bgp --get-depends -o ./models
//! ```

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use ncc::config::{ConnectionArgs, init_logging};
use ncc::error::Error;
use ncc::schema::fetch_with_dependencies;

#[derive(Parser)]
#[command(name = "ncc-get-schema", about = "Select schema download options")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Get just this schema
    #[arg(long)]
    schema: String,

    /// Revision of the schema to retrieve
    #[arg(long = "version")]
    schema_version: Option<String>,

    /// Also get dependencies of the schema, writing everything to files
    #[arg(long)]
    get_depends: bool,

    /// Where to write schema files; modules already there are skipped
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, LevelFilter::Warn);

    let mut session = cli.connection.session_builder().connect().await?;
    let version = cli.schema_version.as_deref();

    if cli.get_depends {
        let outcome =
            fetch_with_dependencies(&mut session, &cli.schema, version, &cli.output_dir).await?;
        for schema in &outcome.written {
            println!("Wrote {}", schema);
        }
        for schema in &outcome.existing {
            println!("Exists {}", schema);
        }
        for (name, reason) in &outcome.failed {
            eprintln!("Failed to get schema {} || {}", name, reason);
        }
    } else {
        match session.get_schema(&cli.schema, version, None).await {
            Ok(text) => println!("{}", text),
            Err(Error::Rpc(e)) => eprintln!(
                "Failed to get schema {} || RPCError: severity={}, tag={}, message={}",
                cli.schema, e.severity, e.tag, e.message
            ),
            Err(e) => return Err(e.into()),
        }
    }

    session.close().await?;
    Ok(())
}
