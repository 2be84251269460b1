//! CLI module for Wayfare.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::tour::InterestTag;
use clap::{Parser, Subcommand};

/// Wayfare - Narrated walking tours
///
/// Writes a personalized audio tour for any place and narrates it to an MP3.
#[derive(Parser, Debug)]
#[command(name = "wayfare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a tour for a location
    Tour {
        /// Place to tour (e.g., "Lisbon", "Central Park, New York")
        location: String,

        /// Interests to cover, in narration order (history, architecture, culinary, culture)
        #[arg(short, long = "interest", value_name = "INTEREST", required = true, num_args = 1.., value_parser = parse_interest)]
        interests: Vec<InterestTag>,

        /// Tour length in minutes (1-20)
        #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
        duration: u32,

        /// Only write the narration, skip speech synthesis
        #[arg(long)]
        no_audio: bool,

        /// Save the narration as Markdown next to the audio
        #[arg(long)]
        save_text: bool,

        /// Output directory (defaults to general.output_dir)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "generation.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

fn parse_interest(s: &str) -> Result<InterestTag, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tour_command() {
        let cli = Cli::try_parse_from([
            "wayfare", "tour", "Lisbon", "-i", "culinary", "history", "-d", "5", "--no-audio",
        ])
        .unwrap();

        match cli.command {
            Commands::Tour {
                location,
                interests,
                duration,
                no_audio,
                save_text,
                output,
            } => {
                assert_eq!(location, "Lisbon");
                assert_eq!(interests, vec![InterestTag::Culinary, InterestTag::History]);
                assert_eq!(duration, 5);
                assert!(no_audio);
                assert!(!save_text);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_tour_requires_interest() {
        assert!(Cli::try_parse_from(["wayfare", "tour", "Lisbon"]).is_err());
        assert!(Cli::try_parse_from(["wayfare", "tour", "Lisbon", "-i", "nightlife"]).is_err());
    }

    #[test]
    fn test_duration_range() {
        assert!(Cli::try_parse_from(["wayfare", "tour", "Rome", "-i", "culture", "-d", "0"]).is_err());
        assert!(Cli::try_parse_from(["wayfare", "tour", "Rome", "-i", "culture", "-d", "21"]).is_err());
    }
}
