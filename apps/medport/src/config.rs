//! # Configuration
//!
//! Command line and environment settings, parsed with clap.
//!
//! Every server and client flag can also come from a `MEDPORT_*` variable;
//! an explicit flag wins over the environment.

use clap::{Args, Parser, Subcommand, ValueEnum};
use medport_client::ClientOptions;
use medport_core::{MedicationStore, MedportError, MemoryStore, RedbStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default address the server listens on.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default server the client commands talk to.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";

/// Default requests per second accepted by the server.
pub const DEFAULT_RATE_LIMIT: u32 = 50;

/// A store that can be shared across request handlers.
pub type SharedStore = Box<dyn MedicationStore + Send + Sync>;

// =============================================================================
// TOP-LEVEL COMMAND
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "medport", version, about = "Medication tracker server and client")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server.
    Serve(ServerConfig),

    /// Validate a submission file and POST it to the server.
    Submit {
        /// JSON file in the form submission format.
        file: PathBuf,
        #[command(flatten)]
        client: ClientConfig,
    },

    /// Fetch the API root and the medication list, printing the raw JSON.
    Connect {
        #[command(flatten)]
        client: ClientConfig,
    },

    /// Check a submission file without sending it.
    Validate {
        file: PathBuf,
    },

    /// Print a blank form as JSON.
    Template,

    /// Convert `#rrggbb` to channels, or `r,g,b` to hex.
    Color {
        value: String,
    },
}

// =============================================================================
// SERVER
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Keep everything in memory.
    #[default]
    Memory,
    /// Persist to a redb file.
    Redb,
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "MEDPORT_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Storage backend.
    #[arg(long, env = "MEDPORT_BACKEND", value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// Database file for the redb backend.
    #[arg(long, env = "MEDPORT_DB", default_value = "medport.redb")]
    pub db: PathBuf,

    /// Require `Authorization: Bearer <key>` on every route but /health.
    #[arg(long, env = "MEDPORT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Requests per second accepted across all clients.
    #[arg(long, env = "MEDPORT_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
    pub rate_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            backend: Backend::Memory,
            db: PathBuf::from("medport.redb"),
            api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Open the configured backend.
    pub fn open_store(&self) -> Result<SharedStore, MedportError> {
        match self.backend {
            Backend::Memory => Ok(Box::new(MemoryStore::new())),
            Backend::Redb => Ok(Box::new(RedbStore::open(&self.db)?)),
        }
    }

    /// The API key, ignoring an empty value.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// Base URL of the MedPort server.
    #[arg(long, env = "MEDPORT_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Give up on a request after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Bearer token sent with every request.
    #[arg(long, env = "MEDPORT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout_secs: None,
            api_key: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn options(&self) -> ClientOptions {
        ClientOptions {
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}
