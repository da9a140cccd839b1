//! Command-line interface for Glass.
//!
//! The `glass` tool administers a forum database directly: it seeds test
//! data, manages user accounts and maintains the tag list.

pub mod args;
pub mod commands;
pub mod utils;

use crate::Result;
use clap::Parser;

pub use args::{Cli, Command};
pub use commands::PopulateCounts;

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

/// Executes an already parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    if cli.command == Command::License {
        commands::license();
        return Ok(());
    }

    let storage = utils::open_storage(&cli.data)?;

    match cli.command {
        Command::Populate {
            users,
            tags,
            topics,
            messages,
        } => {
            let counts = PopulateCounts {
                users,
                tags,
                topics,
                messages,
            };
            commands::populate(&storage, counts, &mut rand::thread_rng())
        }
        Command::AddUser {
            username,
            password,
            email,
            staff,
        } => commands::add_user(&storage, &username, &password, &email, staff),
        Command::SetStaff { username, revoke } => {
            commands::set_staff(&storage, &username, !revoke)
        }
        Command::AddTag { name } => commands::add_tag(&storage, &name),
        Command::RemoveTag { name } => commands::remove_tag(&storage, &name),
        Command::Stats => commands::stats(&storage),
        Command::License => Ok(()),
    }
}
