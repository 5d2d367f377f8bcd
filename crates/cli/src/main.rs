//! `videojuego` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`   — start the HTTP API with the pool keepalive.
//! - `migrate` — apply pending database migrations.
//! - `ping`    — run the liveness probe once and report.
//!
//! Every flag has an environment fallback; a `.env` file is read first.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::{AppState, SessionStore};
use db::{DbPool, PoolConfig, RetryPolicy};
use game::{Game, Liveness, LivenessProbe};

#[derive(Parser)]
#[command(name = "videojuego", about = "Backend for a small RPG lobby", version)]
struct Cli {
    #[command(flatten)]
    pool: PoolArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct PoolArgs {
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[arg(long, env = "VIDEOJUEGO_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    max_connections: u32,

    #[arg(long, env = "VIDEOJUEGO_MIN_CONNECTIONS", default_value_t = 1, global = true)]
    min_connections: u32,

    /// Attempts before a request gives up on an unreachable store.
    #[arg(long, env = "VIDEOJUEGO_ACQUIRE_ATTEMPTS", default_value_t = 12, global = true)]
    acquire_attempts: u32,

    #[arg(long, env = "VIDEOJUEGO_RETRY_DELAY_SECS", default_value_t = 10, global = true)]
    retry_delay_secs: u64,

    /// Allow plaintext connections to the store.
    #[arg(long, env = "VIDEOJUEGO_INSECURE_DB", global = true)]
    insecure_db: bool,
}

impl PoolArgs {
    fn config(&self) -> anyhow::Result<PoolConfig> {
        let url = self
            .database_url
            .clone()
            .context("DATABASE_URL is not set (flag --database-url or environment)")?;

        let mut config = PoolConfig::new(url);
        config.max_connections = self.max_connections;
        config.min_connections = self.min_connections;
        config.require_tls = !self.insecure_db;
        config.retry = RetryPolicy {
            max_attempts: self.acquire_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        };
        config.validate()?;
        Ok(config)
    }

    fn pool(&self) -> anyhow::Result<Arc<DbPool>> {
        Ok(Arc::new(DbPool::from_config(&self.config()?)?))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server.
    Serve {
        #[arg(long, env = "VIDEOJUEGO_BIND", default_value = "0.0.0.0:8080")]
        bind: String,

        /// Seconds between liveness pings; 0 disables them.
        #[arg(long, env = "VIDEOJUEGO_KEEPALIVE_SECS", default_value_t = 300)]
        keepalive_secs: u64,

        /// Idle seconds before a login token expires.
        #[arg(long, env = "VIDEOJUEGO_SESSION_TTL_SECS", default_value_t = 43_200)]
        session_ttl_secs: u64,

        /// Mount `POST /api/session/experience` (trusted deployments only).
        #[arg(long, env = "VIDEOJUEGO_ALLOW_EXPERIENCE_GRANTS")]
        allow_experience_grants: bool,
    },
    /// Run pending database migrations.
    Migrate,
    /// Check that the store answers.
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, keepalive_secs, session_ttl_secs, allow_experience_grants } => {
            anyhow::ensure!(session_ttl_secs > 0, "--session-ttl-secs must be positive");
            let pool = cli.pool.pool()?;
            let game = Game::new(pool);

            if keepalive_secs > 0 {
                tokio::spawn(keepalive(game.liveness.clone(), Duration::from_secs(keepalive_secs)));
            }

            let sessions = SessionStore::new(Duration::from_secs(session_ttl_secs));
            let mut state = AppState::with_sessions(game, sessions);
            state.allow_experience_grants = allow_experience_grants;
            if allow_experience_grants {
                warn!("experience grants are enabled for every logged-in player");
            }

            info!("starting API server on {bind}");
            api::serve(&bind, state)
                .await
                .with_context(|| format!("server on {bind} failed"))?;
        }
        Command::Migrate => {
            let pool = cli.pool.pool()?;
            info!("running migrations");
            db::run_migrations(&pool).await.context("migration failed")?;
            info!("migrations applied");
        }
        Command::Ping => {
            let probe = LivenessProbe::new(cli.pool.pool()?);
            match probe.ping().await {
                Liveness::Alive => println!("alive"),
                Liveness::Degraded => {
                    println!("degraded");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Ping the store every `period` so an idle pool (and store) stays awake.
async fn keepalive(probe: LivenessProbe, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        probe.ping().await;
    }
}
