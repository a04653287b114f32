use std::fmt;

use serde::{Deserialize, Serialize};

const HOUR_BITS: u32 = 5;
const DAY_BITS: u32 = 9;
const DAY_SHIFT: u32 = HOUR_BITS;
const YEAR_SHIFT: u32 = HOUR_BITS + DAY_BITS;

const HOUR_MASK: u32 = (1 << HOUR_BITS) - 1;
const DAY_MASK: u32 = (1 << DAY_BITS) - 1;

pub const DAYS_PER_YEAR: u32 = 360;
pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_WEEK: u32 = 7;

/// Compact simulation timestamp encoding year/day/hour in a single `u32`.
///
/// Bit layout: `[year:18][day_of_year:9][hour:5]`
/// - bits 14-31: year (0–262,143)
/// - bits 5-13:  day  (1–360)
/// - bits 0-4:   hour (0–23)
///
/// Natural `u32` ordering equals chronological ordering, so cooldown and TTL
/// checks are plain comparisons on `to_hours()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "TimestampRepr", from = "TimestampRepr")]
pub struct SimTimestamp(u32);

#[derive(Serialize, Deserialize)]
struct TimestampRepr {
    year: u32,
    day: u32,
    hour: u32,
}

impl From<SimTimestamp> for TimestampRepr {
    fn from(ts: SimTimestamp) -> Self {
        TimestampRepr {
            year: ts.year(),
            day: ts.day(),
            hour: ts.hour(),
        }
    }
}

impl From<TimestampRepr> for SimTimestamp {
    fn from(repr: TimestampRepr) -> Self {
        SimTimestamp::new(repr.year, repr.day, repr.hour)
    }
}

impl SimTimestamp {
    /// Create a timestamp from year, day-of-year (1–360), and hour (0–23).
    pub fn new(year: u32, day: u32, hour: u32) -> Self {
        assert!(
            (1..=DAYS_PER_YEAR).contains(&day),
            "day out of range: {day}"
        );
        assert!(hour < HOURS_PER_DAY, "hour out of range: {hour}");
        Self((year << YEAR_SHIFT) | (day << DAY_SHIFT) | hour)
    }

    /// Create a timestamp for the start of a year (day 1, hour 0).
    pub fn from_year(year: u32) -> Self {
        Self::new(year, 1, 0)
    }

    pub fn year(self) -> u32 {
        self.0 >> YEAR_SHIFT
    }

    pub fn day(self) -> u32 {
        (self.0 >> DAY_SHIFT) & DAY_MASK
    }

    pub fn hour(self) -> u32 {
        self.0 & HOUR_MASK
    }

    /// Total simulated hours since year 0, day 1, hour 0.
    pub fn to_hours(self) -> u64 {
        let days = u64::from(self.year()) * u64::from(DAYS_PER_YEAR) + u64::from(self.day() - 1);
        days * u64::from(HOURS_PER_DAY) + u64::from(self.hour())
    }

    /// The timestamp `hours` simulated hours after this one.
    pub fn add_hours(self, hours: u64) -> Self {
        let total = self.to_hours() + hours;
        let hour = (total % u64::from(HOURS_PER_DAY)) as u32;
        let days = total / u64::from(HOURS_PER_DAY);
        let day = (days % u64::from(DAYS_PER_YEAR)) as u32 + 1;
        let year = (days / u64::from(DAYS_PER_YEAR)) as u32;
        Self::new(year, day, hour)
    }

    /// Hours elapsed since `earlier`, saturating at 0 if `earlier` is later.
    pub fn hours_since(self, earlier: SimTimestamp) -> u64 {
        self.to_hours().saturating_sub(earlier.to_hours())
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "y{} d{} h{}", self.year(), self.day(), self.hour())
    }
}
