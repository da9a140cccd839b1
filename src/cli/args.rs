//! Command-line argument parsing for the Glass administration tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Glass forum administration
#[derive(Parser, Debug)]
#[command(name = "glass")]
#[command(about = "Administer and seed a Glass forum database", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory holding the forum database
    #[arg(long, value_name = "DIR", env = "GLASS_DATA", default_value = crate::forum::storage::DEFAULT_DATA_DIR)]
    pub data: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Command-line interface commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fill the database with generated users, tags, topics and messages
    Populate {
        /// How many users to create
        #[arg(short = 'u', long, value_name = "N", default_value_t = 0)]
        users: usize,

        /// How many tags to create
        #[arg(short = 'g', long, value_name = "N", default_value_t = 0)]
        tags: usize,

        /// How many topics to create
        #[arg(short = 't', long, value_name = "N", default_value_t = 0)]
        topics: usize,

        /// How many messages to create
        #[arg(short = 'm', long, value_name = "N", default_value_t = 0)]
        messages: usize,
    },

    /// Create a user account
    AddUser {
        #[arg(value_name = "USERNAME")]
        username: String,

        /// Password for the new account
        #[arg(long)]
        password: String,

        /// Email address
        #[arg(long, default_value = "")]
        email: String,

        /// Allow the user to edit and delete any message
        #[arg(long)]
        staff: bool,
    },

    /// Grant or revoke the staff role
    SetStaff {
        #[arg(value_name = "USERNAME")]
        username: String,

        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,
    },

    /// Create a tag
    AddTag {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Delete a tag and detach it from every topic
    RemoveTag {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Print entity counts
    Stats,

    /// Show the program's license
    License,
}
