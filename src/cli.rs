use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Debug, Parser, Serialize)]
#[command(name = "highscore", about = "Arcade leaderboard service and offline asset cache")]
pub struct Cli {
    #[command(subcommand)]
    #[serde(skip)]
    pub command: Command,

    /// Trace level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_level: Option<String>,

    /// Leaderboard store, `memory` or `file:<path>`
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the leaderboard endpoint
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind_address: Option<String>,
    },
    /// Check that every offline asset of a deployed origin can be fetched.
    ///
    /// Runs install and activate into an in-memory cache that is discarded
    /// on exit, then reports which assets were cached and which failed.
    WarmCache {
        /// Origin serving the static assets, e.g. https://example.com
        #[arg(long)]
        origin: Option<String>,
        /// Cache version tag
        #[arg(long)]
        version: Option<String>,
    },
}

impl Cli {
    /// Flags that also exist as settings, for the figment layer.
    pub fn overrides(&self) -> CliOverrides<'_> {
        let (bind_address, origin) = match &self.command {
            Command::Serve { bind_address } => (bind_address.as_deref(), None),
            Command::WarmCache { origin, .. } => (None, origin.as_deref()),
        };
        CliOverrides {
            cli: self,
            bind_address,
            origin,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Cli {
            command: Command::Serve { bind_address: None },
            trace_level: None,
            store: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CliOverrides<'a> {
    #[serde(flatten)]
    cli: &'a Cli,
    #[serde(skip_serializing_if = "Option::is_none")]
    bind_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<&'a str>,
}
