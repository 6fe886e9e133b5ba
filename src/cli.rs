use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// identityd: token validation and endpoint catalog service
#[derive(Parser)]
#[command(name = "identityd", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the identity server
    Serve {
        /// Port to bind (overrides IDENTITY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply a YAML seed file to the database
    Seed {
        #[arg(long)]
        file: PathBuf,
    },

    /// Manage tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Manage endpoint templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a token for a user
    Issue {
        #[arg(long)]
        user: String,
        #[arg(long)]
        tenant: Option<String>,
        /// Lifetime in seconds (defaults to IDENTITY_TOKEN_TTL_SECS)
        #[arg(long)]
        ttl: Option<i64>,
    },
    /// Mark a token disabled; it keeps existing and is refused with 403
    Disable {
        #[arg(long)]
        id: String,
    },
    /// Destroy a token; it becomes unrecognized
    Revoke {
        #[arg(long)]
        id: String,
    },
    /// Destroy tokens expired longer than the retention period
    Purge,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List endpoint templates
    List,
    /// Delete an endpoint template
    Delete {
        #[arg(long)]
        id: i64,
    },
}
