//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::cmd_create_user;

/// Assetdesk - printer, supply and requisition desk for IT support teams
#[derive(Parser)]
#[command(name = "assetdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an account without going through the API
    CreateUser {
        /// Login name
        username: String,

        /// Display name
        full_name: String,

        /// One of: admin, manager, technician, printer_technician, electronics_technician
        #[arg(long, default_value = "technician")]
        role: String,

        #[arg(long)]
        password: String,

        /// Organisational unit id
        #[arg(long)]
        unit: Option<i32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["assetdesk"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_create_user() {
        let cli = Cli::try_parse_from([
            "assetdesk",
            "create-user",
            "jdoe",
            "Jane Doe",
            "--role",
            "manager",
            "--password",
            "hunter22",
            "--unit",
            "3",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::CreateUser {
                username,
                role,
                unit,
                ..
            }) => {
                assert_eq!(username, "jdoe");
                assert_eq!(role, "manager");
                assert_eq!(unit, Some(3));
            }
            _ => panic!("expected create-user"),
        }
    }

    #[test]
    fn create_user_requires_password() {
        assert!(Cli::try_parse_from(["assetdesk", "create-user", "jdoe", "Jane Doe"]).is_err());
    }
}
