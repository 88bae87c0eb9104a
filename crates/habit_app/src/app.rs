use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use habit_core::life::LifeSpan;
use habit_data::pagination::DEFAULT_PAGE_SIZE;
use habit_data::DashboardService;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Command;
use crate::render;

pub const DEFAULT_DATA_DIR: &str = "habitdash-data";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub life_span: LifeSpan,
    pub page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            life_span: LifeSpan::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`, falling back to defaults for anything
    /// unset or unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup("HABITDASH_DATA_DIR").filter(|dir| !dir.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(year) = parse_var::<i32>(&lookup, "HABITDASH_BIRTH_YEAR") {
            config.life_span.birth_year = year;
        }
        if let Some(year) = parse_var::<i32>(&lookup, "HABITDASH_END_YEAR") {
            config.life_span.end_year = year;
        }
        if let Some(width) = parse_var::<usize>(&lookup, "HABITDASH_MONTHS_PER_ROW") {
            config.life_span.months_per_row = width;
        }
        if let Some(size) = parse_var::<usize>(&lookup, "HABITDASH_PAGE_SIZE") {
            if size > 0 {
                config.page_size = size;
            }
        }
        config.life_span.validate().context("invalid life span settings")?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn open_service(&self) -> Result<DashboardService> {
        DashboardService::builder()
            .data_dir(&self.data_dir)
            .life_span(self.life_span)
            .page_size(self.page_size)
            .build()
    }
}

fn write_json(out: &mut dyn Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Runs one command against `service`, writing the result to `out`.
pub fn execute(service: &DashboardService, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Annual { year, json } => {
            let cells = service.annual(year)?;
            if json {
                write_json(out, &cells)?;
            } else {
                write!(out, "{}", render::annual(&cells)?)?;
            }
        }
        Command::Life { json } => {
            let grid = service.life()?;
            if json {
                write_json(out, &grid)?;
            } else {
                write!(out, "{}", render::life(&grid)?)?;
            }
        }
        Command::Heatmap { year, reading, json } => {
            if reading {
                let map = service.reading_heatmap(year)?;
                let stats = service.reading_stats();
                if json {
                    write_json(out, &map)?;
                } else {
                    write!(out, "{}", render::reading_heatmap(&map, stats.year(map.year))?)?;
                }
            } else {
                let map = service.habit_heatmap(year)?;
                if json {
                    write_json(out, &map)?;
                } else {
                    write!(out, "{}", render::habit_heatmap(&map)?)?;
                }
            }
        }
        Command::Day { date, json } => {
            let details = service.day(date);
            if json {
                write_json(out, &details)?;
            } else {
                write!(out, "{}", render::day(&details)?)?;
            }
        }
        Command::Toggle { date, habit_id } => {
            let status = service
                .toggle(date, &habit_id)
                .with_context(|| format!("toggling `{habit_id}` on {date}"))?;
            let label = status.map_or("unmarked", |status| status.as_str());
            writeln!(out, "{habit_id} on {date}: {label}")?;
        }
        Command::Stats { trend, json } => {
            let report = service.stats(trend)?;
            if json {
                write_json(out, &report)?;
            } else {
                write!(out, "{}", render::stats(&report)?)?;
            }
        }
        Command::Goals { labels: true, json, .. } => {
            let labels = service.category_labels();
            if json {
                write_json(out, &labels)?;
            } else {
                write!(out, "{}", render::labels(&labels)?)?;
            }
        }
        Command::Goals { year, json, .. } => {
            let stats = service.macro_stats(year);
            if json {
                write_json(out, &stats)?;
            } else {
                write!(out, "{}", render::goals(&stats)?)?;
            }
        }
        Command::Export { file } => {
            let backup = service
                .export_to(&file)
                .with_context(|| format!("exporting to {}", file.display()))?;
            info!(path = %file.display(), records = backup.metadata.total_records, "backup written");
            writeln!(
                out,
                "exported {} records to {}",
                backup.metadata.total_records,
                file.display()
            )?;
        }
        Command::Import { file } => {
            let report = service
                .import_from(&file)
                .with_context(|| format!("importing {}", file.display()))?;
            write!(out, "{}", render::import_report(&report)?)?;
        }
    }
    Ok(())
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    info!(data_dir = %config.data_dir.display(), "opening dashboard");
    let service = config.open_service()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&service, command, &mut out)
}
