//! General NETCONF tool: capabilities, get, get-config and templated
//! edit-config.
//!
//! # Usage
//!
//! ```bash
//! ncc --host 10.0.0.1 -u admin -p secret -c
//! ncc --host 10.0.0.1 --get-oper -x '/if:interfaces-state' --ns if=urn:ietf:params:xml:ns:yang:ietf-interfaces
//! ncc --host 10.0.0.1 --do-edits intf-description --params '{"INTF_NAME": "Gi0/0/0/0", "DESCRIPTION": "uplink"}'
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Args, Parser};
use log::LevelFilter;
use regex::Regex;
use serde_json::Value;

use ncc::capability::{classify, supported_modules};
use ncc::config::{ConnectionArgs, init_logging};
use ncc::error::{Error, RpcError};
use ncc::netconf::{
    Datastore, DefaultOperation, Filter, NamespaceMap, NetconfSession, RpcReply, WithDefaults,
};
use ncc::snippets::{
    self, SNIPPETS_REPO_URL, SnippetKind, Snippets, format_listing, is_undefined_variable,
    load_params,
};

#[derive(Parser)]
#[command(name = "ncc", version, about = "Select your NETCONF operation and parameters")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Debug logging of the NETCONF exchange
    #[arg(short, long)]
    verbose: bool,

    /// Display the time an operation took, excluding connection setup and display
    #[arg(short = 't', long = "time")]
    time: bool,

    /// The NETCONF default operation to use
    #[arg(long, default_value = "merge")]
    default_op: DefaultOperation,

    /// RFC 6243 with-defaults value to use
    #[arg(long)]
    with_defaults: Option<WithDefaults>,

    /// Directory where snippets can be found (default: next to the executable)
    #[arg(long, env = "NCC_SNIPPETS")]
    snippets: Option<PathBuf>,

    /// prefix=NS bindings, or @file.json to merge a JSON object of bindings
    #[arg(long, num_args = 1..)]
    ns: Vec<String>,

    /// JSON-encoded parameters dictionary for templates
    #[arg(long, conflicts_with = "params_file")]
    params: Option<String>,

    /// File with a JSON-encoded parameters dictionary for templates
    #[arg(long)]
    params_file: Option<PathBuf>,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(flatten)]
    operation: Operation,
}

#[derive(Args)]
#[group(multiple = false)]
struct FilterArgs {
    /// NETCONF subtree filter
    #[arg(short, long)]
    filter: Option<String>,

    /// Named subtree filters from the snippets directory
    #[arg(long, num_args = 1..)]
    named_filter: Vec<String>,

    /// NETCONF XPath filter
    #[arg(short = 'x', long)]
    xpath: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Operation {
    /// Display environment variables a user can set
    #[arg(long)]
    env: bool,

    /// Clone the snippets from GitHub into the current directory
    #[arg(long)]
    install_snippets: bool,

    /// Display capabilities of the device
    #[arg(short, long)]
    capabilities: bool,

    /// List advertised YANG modules matching a regex (not anchored)
    #[arg(long, value_name = "REGEX")]
    is_supported: Option<String>,

    /// List named edit-config templates
    #[arg(long)]
    list_templates: bool,

    /// List named filters
    #[arg(long)]
    list_filters: bool,

    /// Get the running config
    #[arg(short, long)]
    get_running: bool,

    /// Get oper data
    #[arg(long)]
    get_oper: bool,

    /// Apply named templates in order, with a single commit when the
    /// candidate datastore is supported
    #[arg(long, num_args = 1.., value_name = "TEMPLATE")]
    do_edits: Vec<String>,

    /// Print where the executable and snippets are, and exit
    #[arg(short, long = "where")]
    where_: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, LevelFilter::Warn);

    let op = &cli.operation;
    let snippets = Snippets::new(snippets_dir(&cli));

    if op.env {
        println!("export NCC_HOST=127.0.0.1");
        println!("export NCC_PORT=2223");
        println!("export NCC_USERNAME=vagrant");
        println!("export NCC_PASSWORD=vagrant");
        return Ok(());
    }
    if op.install_snippets {
        for path in snippets::install_snippets(SNIPPETS_REPO_URL, Path::new(".")).await? {
            println!("Installed {}", path.display());
        }
        return Ok(());
    }
    if op.where_ {
        println!("{}", exe_dir().display());
        println!("snippets: {}", snippets.root().display());
        return Ok(());
    }
    if op.list_templates {
        let entries = snippets.list(SnippetKind::EditConfig)?;
        print!("{}", format_listing("Edit-config templates:", &entries));
        return Ok(());
    }
    if op.list_filters {
        let entries = snippets.list(SnippetKind::Filter)?;
        print!("{}", format_listing("Named filters:", &entries));
        return Ok(());
    }

    let params = load_params(cli.params.as_deref(), cli.params_file.as_deref())?;
    let filters = build_filters(&cli, &snippets, &params)?;

    let mut session = cli.connection.session_builder().connect().await?;

    let mut results: Vec<RpcReply> = Vec::new();
    let mut elapsed = Duration::ZERO;

    if op.get_running || op.get_oper {
        let start = Instant::now();
        for filter in &filters {
            let reply = if op.get_running {
                session
                    .get_config(Datastore::Running, filter.as_ref(), cli.with_defaults)
                    .await?
            } else {
                session.get(filter.as_ref(), cli.with_defaults).await?
            };
            results.push(reply);
        }
        elapsed = start.elapsed();
    } else if !op.do_edits.is_empty() {
        let start = Instant::now();
        match do_edits(&mut session, &snippets, &op.do_edits, cli.default_op, &params).await {
            Ok(()) => {}
            Err(Error::Rpc(e)) => print_rpc_error(&e),
            Err(e) if is_undefined_variable(&e) => {
                println!("Undefined variable {e}.  Use --params to specify json dict");
                process::exit(1);
            }
            Err(e) => return Err(e.into()),
        }
        elapsed = start.elapsed();
    } else if op.capabilities {
        print!("{}", classify(session.server_capabilities()));
    } else if let Some(pattern) = &op.is_supported {
        let pattern = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                eprintln!("Invalid regex: {e}");
                process::exit(1);
            }
        };
        for module in supported_modules(session.server_capabilities(), &pattern) {
            println!("{module}");
        }
    }

    for reply in &results {
        if let Some(data) = reply.data_xml()? {
            println!("{data}");
        }
    }

    if cli.time {
        println!("\nTotal Operation Time = {}", elapsed.as_secs_f64());
    }

    session.close().await?;
    Ok(())
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn snippets_dir(cli: &Cli) -> PathBuf {
    cli.snippets
        .clone()
        .unwrap_or_else(|| exe_dir().join("snippets"))
}

/// One entry per get to issue; `None` means unfiltered.
fn build_filters(
    cli: &Cli,
    snippets: &Snippets,
    params: &Value,
) -> Result<Vec<Option<Filter>>, Error> {
    let args = &cli.filter;
    if let Some(subtree) = &args.filter {
        return Ok(vec![Some(Filter::subtree(subtree.as_str()))]);
    }
    if !args.named_filter.is_empty() {
        let mut filters = Vec::new();
        for name in &args.named_filter {
            match snippets.render(SnippetKind::Filter, name, params) {
                Ok(content) => filters.push(Some(Filter::subtree(content))),
                Err(e) if is_undefined_variable(&e) => {
                    println!("Undefined variable {e}.  Use --params to specify json dict");
                    process::exit(1);
                }
                Err(e) => return Err(e),
            }
        }
        return Ok(filters);
    }
    if let Some(select) = &args.xpath {
        let namespaces = namespace_bindings(&cli.ns)?;
        return match Filter::xpath(select.as_str(), &namespaces) {
            Ok(filter) => Ok(vec![Some(filter)]),
            Err(prefix) => {
                println!("Required prefix \"{prefix}\" not defined");
                process::exit(1);
            }
        };
    }
    Ok(vec![None])
}

/// Apply `--ns` arguments in order. A command-line redefinition of a
/// prefix is fatal; bindings from a file silently overwrite.
fn namespace_bindings(args: &[String]) -> Result<NamespaceMap, Error> {
    let mut namespaces = NamespaceMap::default();
    for arg in args {
        if let Some(file) = arg.strip_prefix('@') {
            let text = std::fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
            let bindings: HashMap<String, String> = serde_json::from_str(&text)
                .map_err(ncc::error::TemplateError::Params)?;
            namespaces.merge(bindings);
            continue;
        }
        let Some((prefix, uri)) = arg.split_once('=') else {
            continue;
        };
        if prefix.is_empty() || uri.is_empty() {
            continue;
        }
        if let Err(clash) = namespaces.bind(prefix, uri) {
            println!("{clash}");
            process::exit(1);
        }
    }
    Ok(namespaces)
}

async fn do_edits(
    session: &mut NetconfSession,
    snippets: &Snippets,
    templates: &[String],
    default_op: DefaultOperation,
    params: &Value,
) -> Result<(), Error> {
    let Some(target) = session.capabilities().edit_target() else {
        eprintln!("Device supports neither candidate nor writable-running");
        process::exit(1);
    };

    let mut configs = Vec::with_capacity(templates.len());
    for name in templates {
        configs.push(snippets.render(SnippetKind::EditConfig, name, params)?);
    }

    for config in &configs {
        session.edit_config(target, config, Some(default_op)).await?;
    }
    if matches!(target, Datastore::Candidate) {
        session.commit().await?;
    }
    Ok(())
}

fn print_rpc_error(e: &RpcError) {
    println!("RPC Error");
    println!("---------");
    println!("severity: {}", e.severity);
    println!("     tag: {}", e.tag);
    if let Some(path) = e.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        println!("    path: {}", path);
    }
    println!(" message: {}", e.message);
    println!("    type: {}", e.error_type);
}
