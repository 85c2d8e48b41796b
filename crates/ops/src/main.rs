mod cmd;
mod config;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cmd::probes::{CorsArgs, SaveArgs};
use config::OpsConfig;

#[derive(Parser)]
#[command(
    name = "cinerp-ops",
    about = "Schema patches, backfills and diagnostics for the cinema production ERP",
    version,
    propagate_version = true
)]
struct Cli {
    /// Print reports as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Dotenv file loaded before reading configuration
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in schema patches and the backfill
    List,

    /// Apply schema patches (all of them when no name is given)
    Patch {
        /// Patch names, see `list`
        names: Vec<String>,
        /// Print the SQL without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which patch steps are already reflected in the schema
    Status {
        names: Vec<String>,
    },

    /// Rewrite project_locations.stage into the JSON-array stages column
    Backfill {
        /// Count the rows that would change, then roll back
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the versioned sqlx migrations from a directory
    Migrate {
        #[arg(long, default_value = "migrations")]
        source: PathBuf,
    },

    /// Send a CORS preflight and report whether a browser would proceed
    CorsProbe {
        /// Endpoint to probe (default: API_BASE_URL)
        #[arg(long)]
        url: Option<String>,
        /// Origin header (default: CORS_ORIGIN)
        #[arg(long)]
        origin: Option<String>,
        #[arg(long, default_value = "POST")]
        method: String,
        /// Request headers to ask for, comma separated
        #[arg(long, value_delimiter = ',', default_value = "content-type,authorization")]
        headers: Vec<String>,
    },

    /// Replay a save request with a literal JSON payload
    ReproSave {
        /// Path under API_BASE_URL, e.g. /api/project-locations/12
        #[arg(long)]
        path: String,
        /// Inline JSON body
        #[arg(long, conflicts_with = "payload_file")]
        payload: Option<String>,
        /// File holding the JSON body
        #[arg(long)]
        payload_file: Option<PathBuf>,
        #[arg(long, default_value = "POST")]
        method: String,
        /// Bearer token for the Authorization header
        #[arg(long, env = "API_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Print environment values with secrets masked
    EnvDump {
        /// Read this dotenv file instead of the process environment
        #[arg(long)]
        file: Option<PathBuf>,
        /// Show secret values unmasked
        #[arg(long)]
        reveal: bool,
    },

    /// Re-encode text files as UTF-8 without BOM, with LF line endings
    FixEncoding {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Report only, do not rewrite
        #[arg(long)]
        check: bool,
    },

    /// Read a Supabase table and tally one column's values
    SupabaseCheck {
        #[arg(long, default_value = "users")]
        table: String,
        #[arg(long, default_value = "user_type")]
        column: String,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },
}

fn init_tracing(log_json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cinerp_ops=info,cinerp_db=info,cinerp_diagnostics=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // fix-encoding may be pointed at a broken .env, so a load failure is only logged.
    let loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| path.clone()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded dotenv file"),
        Err(e) if e.not_found() => tracing::debug!("No dotenv file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load dotenv file"),
    }

    let config = OpsConfig::from_env()?;
    let json = cli.json;

    match cli.command {
        Commands::List => cmd::schema::list(json),
        Commands::Patch { names, dry_run } => {
            cmd::schema::patch(&config, &names, dry_run, json).await
        }
        Commands::Status { names } => cmd::schema::status(&config, &names, json).await,
        Commands::Backfill { dry_run } => cmd::schema::backfill(&config, dry_run, json).await,
        Commands::Migrate { source } => cmd::schema::migrate(&config, &source, json).await,
        Commands::CorsProbe {
            url,
            origin,
            method,
            headers,
        } => {
            let args = CorsArgs {
                url,
                origin,
                method,
                headers,
            };
            cmd::probes::cors_probe(&config, args, json).await
        }
        Commands::ReproSave {
            path,
            payload,
            payload_file,
            method,
            token,
        } => {
            let args = SaveArgs {
                path,
                payload,
                payload_file,
                method,
                token,
            };
            cmd::probes::repro_save(&config, args, json).await
        }
        Commands::EnvDump { file, reveal } => cmd::env_dump::run(file.as_deref(), reveal, json),
        Commands::FixEncoding { files, check } => cmd::fix_encoding::run(&files, check, json),
        Commands::SupabaseCheck {
            table,
            column,
            limit,
        } => cmd::probes::supabase_check(&config, &table, &column, limit, json).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
