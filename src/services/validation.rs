//! Series integrity checks.
//!
//! Violations are reported, never repaired. Ordering and OHLC problems make a
//! cached table untrustworthy; wide gaps are only flagged.

use crate::types::Bar;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A single problem found in a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// `low <= open, close <= high` does not hold.
    OhlcViolation { date: NaiveDate },
    /// Date not strictly after its predecessor.
    NonIncreasingDate { previous: NaiveDate, date: NaiveDate },
    /// Calendar gap wider than the configured bound.
    Gap {
        from: NaiveDate,
        to: NaiveDate,
        days: i64,
    },
}

impl ValidationIssue {
    /// Issues that invalidate a cached table.
    pub fn is_integrity_error(&self) -> bool {
        !matches!(self, ValidationIssue::Gap { .. })
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::OhlcViolation { date } => write!(f, "OHLC invariant broken on {}", date),
            ValidationIssue::NonIncreasingDate { previous, date } => {
                write!(f, "date {} does not follow {}", date, previous)
            }
            ValidationIssue::Gap { from, to, days } => {
                write!(f, "{} day gap between {} and {}", days, from, to)
            }
        }
    }
}

/// Result of validating a series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_integrity_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_integrity_error)
    }

    /// First integrity error, for error messages.
    pub fn first_integrity_error(&self) -> Option<&ValidationIssue> {
        self.issues.iter().find(|i| i.is_integrity_error())
    }
}

/// Validate bars in their stored order.
pub fn validate_bars(bars: &[Bar], max_gap_days: i64) -> ValidationReport {
    let mut issues = Vec::new();

    for bar in bars {
        if !bar.is_consistent() {
            issues.push(ValidationIssue::OhlcViolation { date: bar.date });
        }
    }

    for pair in bars.windows(2) {
        let (previous, current) = (pair[0].date, pair[1].date);
        if current <= previous {
            issues.push(ValidationIssue::NonIncreasingDate {
                previous,
                date: current,
            });
            continue;
        }
        let days = (current - previous).num_days();
        if days > max_gap_days {
            issues.push(ValidationIssue::Gap {
                from: previous,
                to: current,
                days,
            });
        }
    }

    ValidationReport { issues }
}
