use std::path::PathBuf;

use clap::{Parser, Subcommand};
use habit_core::{DateKey, Granularity};

#[derive(Debug, Parser)]
#[command(name = "habitdash", version, about = "Habit tracking dashboard")]
pub struct Cli {
    /// Directory holding the table files (overrides HABITDASH_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Day-by-day grid for one year
    Annual {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        json: bool,
    },
    /// Life in months, one cell per month
    Life {
        #[arg(long)]
        json: bool,
    },
    /// Monday-aligned weekly heatmap
    Heatmap {
        #[arg(long)]
        year: Option<i32>,
        /// Show the reading log instead of habits
        #[arg(long)]
        reading: bool,
        #[arg(long)]
        json: bool,
    },
    /// Habit statuses for one day
    Day {
        date: DateKey,
        #[arg(long)]
        json: bool,
    },
    /// Cycle a habit's status: unmarked, done, missed
    Toggle { date: DateKey, habit_id: String },
    /// Completion statistics
    Stats {
        /// Add a trend series by day, week, month or year
        #[arg(long, value_name = "GRANULARITY")]
        trend: Option<Granularity>,
        #[arg(long)]
        json: bool,
    },
    /// Long-term goal summary for a year
    Goals {
        #[arg(long)]
        year: Option<i32>,
        /// List the colour category names instead
        #[arg(long)]
        labels: bool,
        #[arg(long)]
        json: bool,
    },
    /// Write a full backup to FILE
    Export { file: PathBuf },
    /// Restore a backup from FILE
    Import { file: PathBuf },
}
