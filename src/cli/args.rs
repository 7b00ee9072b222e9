//! CLI argument definitions using clap
//!
//! Commands:
//! - crmcore query   --config <path> --entity <name>
//! - crmcore compile --config <path> --entity <name>
//! - crmcore get     --config <path> --entity <name> --id <uuid>
//! - crmcore create  --config <path> --entity <name> --user <uuid>
//! - crmcore update  --config <path> --entity <name> --id <uuid> --user <uuid>
//! - crmcore delete  --config <path> --entity <name> --id <uuid>
//! - crmcore audit   --config <path> [--entity <name>] [--user <uuid>] [--limit <n>]
//!
//! Request bodies are read from stdin as JSON.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// crmcore - filter, paging and audit core for CRM entities
#[derive(Parser, Debug)]
#[command(name = "crmcore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a {filter, sorting, paging} request read from stdin
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        /// Catalog entity, e.g. deals
        #[arg(long)]
        entity: String,
    },

    /// Print the compiled pipeline for a request read from stdin
    Compile {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        #[arg(long)]
        entity: String,
    },

    /// Fetch one document with its relations
    Get {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        id: Uuid,
    },

    /// Create documents from a JSON object or array read from stdin
    Create {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        #[arg(long)]
        entity: String,
        /// Acting user, recorded on the document and its audit entry
        #[arg(long)]
        user: Uuid,
    },

    /// Apply a JSON patch read from stdin to one document
    Update {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        user: Uuid,
    },

    /// Remove one document
    Delete {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        id: Uuid,
    },

    /// Print the audit activity feed, newest first
    Audit {
        /// Path to configuration file
        #[arg(long, default_value = "./crmcore.json")]
        config: PathBuf,
        /// Catalog entity or audit target name, e.g. deals or Deal
        #[arg(long)]
        entity: Option<String>,
        #[arg(long)]
        user: Option<Uuid>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

impl Command {
    /// Whether the command reads a request body from stdin
    pub fn reads_stdin(&self) -> bool {
        matches!(
            self,
            Command::Query { .. } | Command::Compile { .. } | Command::Create { .. } | Command::Update { .. }
        )
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
