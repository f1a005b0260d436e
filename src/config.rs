//! Command line and environment configuration.
//!
//! Every flag can also be set through the environment (a `.env` file is
//! loaded first):
//!   DATABASE_URL          - Postgres connection string; unset = in-memory store
//!   SECRET_KEY            - HMAC secret for session tokens
//!   BIND_ADDR             - listen address (default: 0.0.0.0:5000)
//!   STATIC_DIR            - directory served under /static
//!   SESSION_TTL_HOURS     - session lifetime
//!   DB_MAX_CONNECTIONS    - Postgres pool size
//!   SEED_ADMIN_PASSWORD   - password for the admin created by /setup
//!   EVENT_CHANNEL_CAPACITY - per-viewer backlog before updates are skipped
//!   PASSWORD_COST         - bcrypt work factor for new password hashes

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::model::Role;
use crate::password::DEFAULT_PASSWORD_COST;
use crate::service::SetupSeed;

pub const DEFAULT_SECRET_KEY: &str = "dev-secret";

#[derive(Debug, Parser)]
#[command(name = "club-booking", version, about = "Club room and slot booking server")]
pub struct Cli {
    #[command(flatten)]
    pub config: ServerConfig,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create the schema and seed the first club and admin.
    InitDb,
    /// Register a club.
    AddClub { name: String },
    /// Register a user.
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user", value_parser = parse_role)]
        role: Role,
        /// Home club name; required for club_admin.
        #[arg(long)]
        club: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "SECRET_KEY", default_value = DEFAULT_SECRET_KEY, hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    pub bind_addr: String,

    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = 12)]
    pub session_ttl_hours: u64,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, env = "SEED_ADMIN_PASSWORD", default_value = "admin123", hide_env_values = true)]
    pub seed_admin_password: String,

    #[arg(long, env = "EVENT_CHANNEL_CAPACITY", default_value_t = 64)]
    pub event_channel_capacity: usize,

    #[arg(long, env = "PASSWORD_COST", default_value_t = DEFAULT_PASSWORD_COST)]
    pub password_cost: u32,
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours.max(1) * 3600)
    }

    pub fn seed(&self) -> SetupSeed {
        SetupSeed {
            admin_password: self.seed_admin_password.clone(),
            ..SetupSeed::default()
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{s}' (user, club_admin, super_admin)"))
}
