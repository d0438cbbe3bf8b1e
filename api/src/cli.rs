//! Command-line interface
//!
//! ```bash
//! # Run the HTTP server (default)
//! canteen-api serve
//!
//! # Zero every balance for the new month (cron on the 1st)
//! canteen-api reset-tokens
//!
//! # Create the first administrator
//! canteen-api create-admin --username admin --password secret1
//! ```

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canteen-api")]
#[command(author, version, about = "Canteen ordering backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server
    Serve,
    /// Reset every token balance for the current month
    ResetTokens {
        /// Reset even when today is not the 1st
        #[arg(long)]
        force: bool,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
}

impl Cli {
    /// The subcommand to run; `serve` when none is given
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["canteen-api"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn parses_reset_tokens_force() {
        let cli = Cli::try_parse_from(["canteen-api", "reset-tokens", "--force"]).unwrap();
        assert_eq!(cli.command(), Command::ResetTokens { force: true });
    }

    #[test]
    fn create_admin_requires_password() {
        assert!(Cli::try_parse_from(["canteen-api", "create-admin", "--username", "root"]).is_err());

        let cli = Cli::try_parse_from([
            "canteen-api",
            "create-admin",
            "-u",
            "root",
            "-p",
            "secret1",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::CreateAdmin {
                username: "root".to_string(),
                password: "secret1".to_string(),
            }
        );
    }
}
