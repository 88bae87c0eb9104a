//! Calendar aggregation engine for the habit dashboard.
//!
//! Everything here is pure: callers pass `today` (or a [`clock::Clock`])
//! explicitly and no function reads the wall clock on its own.

pub mod aggregate;
pub mod annual;
pub mod calendar;
pub mod clock;
pub mod date;
pub mod error;
pub mod goals;
pub mod habit;
pub mod heatmap;
pub mod intensity;
pub mod life;
pub mod reading;
pub mod stats;

pub use crate::aggregate::{aggregate_day, aggregate_range, valid_habits, DayAggregate, RangeAggregate};
pub use crate::calendar::{bucket_of, buckets, year_buckets, Bucket, Granularity};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::date::DateKey;
pub use crate::error::{CoreError, Result};
pub use crate::habit::{DayLog, Habit, HabitId, HabitStatus};
pub use crate::intensity::{hue, CellShade};
pub use crate::life::LifeSpan;
pub use crate::reading::ReadingLog;
