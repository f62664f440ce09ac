//! Main entry point for the Glamour Touch backend.
//!
//! Parses the command line, loads configuration, opens the database and
//! either serves the API or runs one of the maintenance commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use salon_backend::auth::service::{create_account_hashed, NewAccount};
use salon_backend::config::AppConfig;
use salon_backend::database::models::Role;
use salon_backend::database::{seed, Database};
use salon_backend::server::{self, AppState};
use salon_backend::utils::split_full_name;

#[derive(Parser, Debug)]
#[command(name = "salon-backend", version, about = "Glamour Touch salon backend")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create or update the database schema.
    Migrate,
    /// Insert the default services, payment methods and sample products.
    Seed,
    /// Create an administrator account with superuser rights.
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,salon_backend=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let db = Database::open(&config.database.path)
        .with_context(|| format!("opening database {}", config.database.path.display()))?;
    db.migrate().context("applying schema")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mailer = config.mail.build_adapter().context("building mail adapter")?;
            tracing::info!("Mail delivery via {} adapter", mailer.name());
            let state = AppState::new(config, db, mailer).context("building app state")?;
            server::run(state).await.context("server error")?;
        }
        Command::Migrate => {
            tracing::info!("Schema is up to date");
        }
        Command::Seed => {
            let summary = db.with_tx(|tx| seed::seed_defaults(tx))?;
            tracing::debug!("{:?}", summary);
        }
        Command::CreateSuperuser { email, password, name } => {
            let (first_name, last_name) = split_full_name(name.as_deref().unwrap_or(""));
            let account = NewAccount {
                email,
                password,
                first_name,
                last_name,
                phone: None,
                role: Role::Admin,
                is_superuser: true,
            };
            let user =
                create_account_hashed(&db, config.auth.password_iterations, &account).await?;
            tracing::info!("Created superuser {} ({})", user.email, user.id);
        }
    }

    Ok(())
}
