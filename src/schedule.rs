//! Start / end / duration reconciliation shared by every task form.
//!
//! Of the three fields, the two edited most recently determine the third:
//! editing the end date recomputes the duration, editing the duration recomputes
//! the end date, and editing the start date recomputes whichever of the other two
//! was edited longer ago.

use chrono::{Duration, NaiveDate};

/// The field last touched by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Due,
    Duration,
}

/// Form-side timeline of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub duration: u32,
    last: Option<Edit>,
}

impl Schedule {
    /// Seed from stored values without running the rule.
    pub fn new(start: Option<NaiveDate>, due: Option<NaiveDate>, duration: u32) -> Self {
        Schedule { start, due, duration, last: None }
    }

    pub fn set_start(&mut self, start: Option<NaiveDate>) {
        self.start = start;
        match self.last {
            Some(Edit::Duration) => self.derive_due(),
            _ => {
                self.derive_duration();
                self.derive_due();
            }
        }
    }

    pub fn set_due(&mut self, due: Option<NaiveDate>) {
        self.due = due;
        self.last = Some(Edit::Due);
        self.derive_duration();
    }

    pub fn set_duration(&mut self, days: u32) {
        self.duration = days;
        self.last = Some(Edit::Duration);
        self.derive_due();
    }

    fn derive_duration(&mut self) {
        if let (Some(start), Some(due)) = (self.start, self.due) {
            self.duration = days_between(start, due);
        }
    }

    fn derive_due(&mut self) {
        if let Some(start) = self.start {
            if self.duration > 0 {
                self.due = Some(start + Duration::days(i64::from(self.duration)));
            }
        }
    }
}

/// Whole days between two dates, direction ignored.
pub fn days_between(start: NaiveDate, due: NaiveDate) -> u32 {
    u32::try_from((due - start).num_days().unsigned_abs()).unwrap_or(u32::MAX)
}
