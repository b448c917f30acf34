use crate::domain::model::AvailabilityStatus;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "chauffeur-availability")]
#[command(about = "Declare chauffeur availability for scheduled events")]
pub struct CliArgs {
    /// TOML configuration file; without it AIRTABLE_* environment variables are used
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the chauffeur roster
    Chauffeurs,
    /// List scheduled events
    Events,
    /// Show every event with the chauffeur's declared availability
    Show {
        #[arg(long)]
        chauffeur: String,
    },
    /// Declare availability for one event
    Set {
        #[arg(long)]
        chauffeur: String,
        #[arg(long)]
        event: String,
        /// Available, Not Available or Maybe Available
        #[arg(long)]
        status: AvailabilityStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_command() {
        let args = CliArgs::try_parse_from([
            "chauffeur-availability",
            "set",
            "--chauffeur",
            "recC1",
            "--event",
            "recE1",
            "--status",
            "not-available",
            "--verbose",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Set {
                chauffeur,
                event,
                status,
            } => {
                assert_eq!(chauffeur, "recC1");
                assert_eq!(event, "recE1");
                assert_eq!(status, AvailabilityStatus::NotAvailable);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_status() {
        let parsed = CliArgs::try_parse_from([
            "chauffeur-availability",
            "set",
            "--chauffeur",
            "c",
            "--event",
            "e",
            "--status",
            "perhaps",
        ]);
        assert!(parsed.is_err());
    }
}
