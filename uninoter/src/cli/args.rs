//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, FallbackPolicy};

/// UniNoter - collaborative notes on shared topics
#[derive(Parser, Debug)]
#[command(name = "uninoter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root URL of the UniNoter service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory for the session and offline cache
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// What to show when the service is unreachable
    #[arg(long, value_enum)]
    pub fallback: Option<FallbackPolicy>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Flags given on the command line win over the environment.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.base_url {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }
        config
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// List topics, newest first
    Topics,

    /// Create a topic
    Create {
        /// Topic title
        title: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show a topic with its report and contributions
    Show {
        /// Topic ID
        id: String,
    },

    /// Add a contribution to a topic
    Contribute {
        /// Topic ID
        id: String,

        /// Contribution text
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },

    /// Generate and print the topic report
    Report {
        /// Topic ID
        id: String,
    },

    /// Invite collaborators to a topic by email
    Invite {
        /// Topic ID
        id: String,

        /// Email addresses to invite
        #[arg(required = true)]
        emails: Vec<String>,
    },

    /// Run the development backend
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Where the backend keeps its JSON files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}
