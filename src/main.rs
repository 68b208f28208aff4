//! `pddb` server binary: load a database and expose it over HTTP.
//!
//! ```bash
//! # read-only, current directory
//! pddb mydb
//!
//! # writable, custom root and port
//! pddb mydb --permissions w --root-dir /var/lib/pddb --port 9000
//!
//! # options from a file, CLI flags win
//! pddb mydb --config pddb.toml
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pddb::db::PermissionMode;
use pddb::{DB, Options};

#[derive(Parser, Debug)]
#[command(
    name = "pddb",
    version,
    about = "Load a local database and expose its API via HTTP requests"
)]
struct Args {
    /// Name of the database
    dbname: String,

    /// Default permissions for all tables (r or w)
    #[arg(long, env = "PDDB_PERMISSIONS")]
    permissions: Option<String>,

    /// Root folder where the database is stored
    #[arg(long, value_name = "DIR", env = "PDDB_ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "PDDB_HOST")]
    host: String,

    /// HTTP port where the API is made available
    #[arg(short = 'p', long, default_value_t = 8080, env = "PDDB_PORT")]
    port: u16,

    /// Options file (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep everything in memory; nothing is loaded or saved
    #[arg(long)]
    memory: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "PDDB_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let options = load_options(&args)?;
    let db = DB::open(&args.dbname, options)
        .with_context(|| format!("failed to open database \"{}\"", args.dbname))?;

    let addr = bind_addr(&args.host, args.port)?;
    pddb::server::serve(Arc::new(db), addr)
        .await
        .context("server error")
}

/// Accepts IPv4 and IPv6 literals, e.g. `0.0.0.0` or `::`.
fn bind_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("invalid host address \"{host}\""))?;
    Ok(SocketAddr::new(ip, port))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("pddb={level}")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_options(args: &Args) -> Result<Options> {
    let mut options = match &args.config {
        Some(path) => Options::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Options::default(),
    };

    if let Some(perm) = &args.permissions {
        options.permissions = perm.parse::<PermissionMode>()?;
    }
    if let Some(dir) = &args.root_dir {
        options.root_dir = dir.clone();
    }
    if args.memory {
        options.persistent = false;
        options.auto_load = false;
    }
    Ok(options)
}
