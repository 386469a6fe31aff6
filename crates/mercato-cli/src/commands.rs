//! Available subcommands.

use clap::Subcommand;
use mercato_core::services::DEFAULT_SEED_PASSWORD;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port to listen on (overrides `MERCATO_PORT`)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load demo accounts, listings, services and a mission
    Seed {
        /// Delete all existing rows first
        #[arg(long)]
        reset: bool,
        /// Password given to every demo account
        #[arg(long, env = "MERCATO_SEED_PASSWORD", default_value = DEFAULT_SEED_PASSWORD)]
        password: String,
    },

    /// Remove expired sessions and cancel stale pending missions
    Cleanup {
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Grant the admin role to an existing account
    PromoteAdmin {
        /// Email address of the account
        email: String,
    },

    /// List every listing with its owner, tier and verification state
    ListBusinesses {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
