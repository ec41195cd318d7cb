use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::Ctx;

#[derive(Parser)]
#[command(name = "etr")]
#[command(about = "Business registry reconciliation CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (repeatable)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one TIN against the registry and print the summary
    Sync {
        #[arg(long)]
        tin: String,

        /// Use an in-memory store; nothing is persisted
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// License commands
    Licence {
        #[command(subcommand)]
        cmd: LicenceCmd,
    },

    /// Raw registry lookups (nothing is stored)
    Registry {
        #[command(subcommand)]
        cmd: RegistryCmd,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LicenceCmd {
    /// Refresh one stored license from its registry detail record
    Refresh {
        #[arg(long)]
        licence_no: String,

        #[arg(long)]
        tin: String,

        /// Registry language (defaults to config `registry.lang`)
        #[arg(long)]
        lang: Option<String>,
    },
}

#[derive(Subcommand)]
enum RegistryCmd {
    /// Registration record for a TIN
    Registration {
        #[arg(long)]
        tin: String,
    },

    /// Detail record for one license
    Detail {
        #[arg(long)]
        licence_no: String,

        #[arg(long)]
        tin: String,

        #[arg(long)]
        lang: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Sync { tin, dry_run } => {
            let ctx = Ctx::load(&cli.config_paths)?;
            commands::sync::sync(&ctx, &tin, dry_run).await?;
        }

        Commands::Licence { cmd } => match cmd {
            LicenceCmd::Refresh {
                licence_no,
                tin,
                lang,
            } => {
                let ctx = Ctx::load(&cli.config_paths)?;
                commands::sync::refresh_licence(&ctx, &licence_no, &tin, lang.as_deref()).await?;
            }
        },

        Commands::Registry { cmd } => {
            let ctx = Ctx::load(&cli.config_paths)?;
            match cmd {
                RegistryCmd::Registration { tin } => {
                    commands::registry::registration(&ctx, &tin).await?;
                }
                RegistryCmd::Detail {
                    licence_no,
                    tin,
                    lang,
                } => {
                    commands::registry::detail(&ctx, &licence_no, &tin, lang.as_deref()).await?;
                }
            }
        }

        Commands::Db { cmd } => {
            let ctx = Ctx::load(&cli.config_paths)?;
            let secrets = etr_config::resolve_secrets(&ctx.cfg);
            let pool = etr_db::connect(secrets.require_database_url()?).await?;
            match cmd {
                DbCmd::Status => {
                    let s = etr_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_companies_table={} companies={}",
                        s.ok, s.has_companies_table, s.companies
                    );
                }
                DbCmd::Migrate => {
                    etr_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = etr_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
