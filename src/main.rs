//! Binary entry point for warden.
//!
//! This binary provides the CLI interface for the warden identity store.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use warden::cli::{self, OutputFormat};
use warden::config::WardenConfig;
use warden::observability::{LoggingConfig, init_logging};
use warden::services::IdentityService;

/// Warden - capability-based identity and resource-role authorization.
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Act as this identity instead of with full trust.
    #[arg(short, long, global = true, env = "WARDEN_ACTOR")]
    actor: Option<String>,

    /// Output format: json or table.
    #[arg(short, long, global = true, default_value = "json")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and the configured seed identities.
    Init,

    /// Insert an identity.
    Insert {
        /// Identity JSON, or `{"identity": ..., "meta": ...}`.
        payload: String,

        /// Resource roles to grant (JSON object or array).
        #[arg(short, long)]
        roles: Option<String>,
    },

    /// Show an identity.
    Get {
        /// Identity id.
        id: String,

        /// Treat deleted identities as missing.
        #[arg(long)]
        active: bool,
    },

    /// List identities.
    List {
        /// Filter by status: active or deleted.
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by type (e.g. `Group`).
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Filter by email.
        #[arg(long)]
        email: Option<String>,

        /// Filter by group membership.
        #[arg(long)]
        member_of: Option<String>,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Patch identity attributes.
    Update {
        /// Identity id.
        id: String,

        /// Sequence last read.
        #[arg(short = 'n', long)]
        sequence: u64,

        /// JSON patch (array of add/replace/remove operations).
        #[arg(short, long)]
        patch: String,
    },

    /// Soft-delete or restore an identity.
    Status {
        /// Identity id.
        id: String,

        /// New status: active or deleted.
        status: String,

        /// Sequence last read.
        #[arg(short = 'n', long)]
        sequence: u64,
    },

    /// Grant and revoke resource roles.
    Roles {
        /// Identity id.
        id: String,

        /// Sequence last read.
        #[arg(short = 'n', long)]
        sequence: u64,

        /// Resource roles to grant (JSON object or array).
        #[arg(long)]
        add: Option<String>,

        /// Resource roles to revoke (JSON object or array).
        #[arg(long)]
        remove: Option<String>,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match WardenConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut logging = LoggingConfig::from_settings(&config.logging);
    if cli.verbose {
        logging = logging.verbose();
    }
    if let Err(e) = init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &WardenConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = IdentityService::from_config(config)?;
    let actor = cli::resolve_actor(&service, cli.actor.as_deref())?;
    let format = OutputFormat::parse(&cli.format);
    tracing::debug!(actor = %actor.label(), data_dir = %config.data_dir.display(), "Resolved actor");

    match cli.command {
        Commands::Init => cli::cmd_init(&service, config),

        Commands::Insert { payload, roles } => {
            cli::cmd_insert(&service, &actor, payload, roles, format)
        },

        Commands::Get { id, active } => cli::cmd_get(&service, &actor, id, active, format),

        Commands::List {
            status,
            kind,
            email,
            member_of,
            limit,
        } => {
            let filter = cli::build_filter(status.as_deref(), kind, email, member_of, limit)?;
            cli::cmd_list(&service, &actor, &filter, format)
        },

        Commands::Update {
            id,
            sequence,
            patch,
        } => cli::cmd_update(&service, &actor, id, sequence, patch, format),

        Commands::Status {
            id,
            status,
            sequence,
        } => cli::cmd_status(&service, &actor, id, status, sequence, format),

        Commands::Roles {
            id,
            sequence,
            add,
            remove,
        } => cli::cmd_roles(&service, &actor, id, sequence, add, remove, format),
    }
}
