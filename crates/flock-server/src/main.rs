//! Flock server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `FLOCK_*`
//! environment variables, opens the SQLite store, and serves the JSON API.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `bootstrap_admin_password_hash`:
//!
//! ```text
//! cargo run -p flock-server -- --hash-password
//! ```

mod config;

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use flock_api::{AppState, AuthConfig, WebhookConfig, auth::hash_password};
use flock_core::{
  account::{NewAdmin, ROLE_SUPER_ADMIN},
  store::RosterStore,
};
use flock_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Flock church roster server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("FLOCK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let database_path = expand_tilde(&server_cfg.database_path);
  let store = SqliteStore::open(&database_path)
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;

  bootstrap_admin(&store, &server_cfg).await?;

  let uploads_dir = expand_tilde(&server_cfg.uploads_dir);
  tokio::fs::create_dir_all(&uploads_dir)
    .await
    .with_context(|| format!("failed to create uploads dir {uploads_dir:?}"))?;

  if server_cfg.webhook_secret.is_none() {
    tracing::warn!("webhook_secret is not set; Cognito webhooks are disabled");
  }

  let state = AppState::new(
    store,
    AuthConfig { jwt_secret: server_cfg.jwt_secret.clone() },
    WebhookConfig { secret: server_cfg.webhook_secret.clone() },
    Duration::from_secs(server_cfg.dedup_ttl_secs),
    uploads_dir,
  );

  let app = flock_api::app(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Seed the first `super_admin` when the admin table is empty.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let (Some(username), Some(password_hash)) =
    (&cfg.bootstrap_admin_username, &cfg.bootstrap_admin_password_hash)
  else {
    return Ok(());
  };
  if store.count_admins().await.context("failed to count admins")? > 0 {
    return Ok(());
  }

  let admin = store
    .create_admin(NewAdmin {
      first_name:    "Super".to_owned(),
      last_name:     "Admin".to_owned(),
      email:         None,
      phone:         None,
      username:      username.trim().to_lowercase(),
      password_hash: password_hash.clone(),
      role:          ROLE_SUPER_ADMIN.to_owned(),
    })
    .await
    .context("failed to create bootstrap admin")?;
  tracing::info!(admin_id = admin.id, username = %admin.username, "bootstrap admin created");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
