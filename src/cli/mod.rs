//! CLI interface using clap.
//!
//! A single-shot tool, so there are no subcommands; everything is flags.

use std::path::PathBuf;

use clap::Parser;

use crate::application::{PollOptions, TakeoutOptions};

/// Refern Takeout - download every board and collection from a refern.app account.
#[derive(Parser, Debug)]
#[command(name = "refern-takeout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The username/handle of your refern account (the one beginning with '@').
    #[arg(short, long, value_name = "USERNAME")]
    pub username: String,

    /// Path to a file containing your authorization token. If omitted,
    /// you'll be prompted for the token interactively.
    #[arg(short, long, value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Directory to save boards and collections to.
    #[arg(short, long, value_name = "DIR", default_value = "refern")]
    pub output: PathBuf,

    /// Show debug messages.
    #[arg(short, long)]
    pub debug: bool,

    /// Maximum age in hours a prior collection export may have before a
    /// fresh one is triggered.
    #[arg(long, value_name = "HOURS", default_value_t = 12)]
    pub max_export_age_hours: u32,

    /// Seconds to wait between export status polls.
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Give up after this many poll rounds (default: poll until done).
    #[arg(long, value_name = "N")]
    pub max_poll_attempts: Option<u32>,
}

impl Cli {
    /// Translate flags into takeout run options.
    #[must_use]
    pub fn takeout_options(&self) -> TakeoutOptions {
        TakeoutOptions {
            output_dir: self.output.clone(),
            max_export_age: chrono::Duration::hours(i64::from(self.max_export_age_hours)),
            poll: PollOptions {
                interval: std::time::Duration::from_secs(self.poll_interval_secs),
                max_attempts: self.max_poll_attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["refern-takeout", "-u", "@someone"]);

        assert_eq!(cli.username, "@someone");
        assert_eq!(cli.output, PathBuf::from("refern"));
        assert!(!cli.debug);

        let options = cli.takeout_options();
        assert_eq!(options.max_export_age, chrono::Duration::hours(12));
        assert_eq!(options.poll.interval, std::time::Duration::from_secs(10));
        assert!(options.poll.max_attempts.is_none());
    }

    #[test]
    fn test_polling_flags() {
        let cli = Cli::parse_from([
            "refern-takeout",
            "-u",
            "someone",
            "--poll-interval-secs",
            "2",
            "--max-poll-attempts",
            "30",
        ]);

        let options = cli.takeout_options();
        assert_eq!(options.poll.interval, std::time::Duration::from_secs(2));
        assert_eq!(options.poll.max_attempts, Some(30));
    }
}
