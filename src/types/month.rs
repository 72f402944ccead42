use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month, stored as `Month(year, month)` with `month` in `1..=12`.
///
/// Monthly trip files are keyed by this type and it resolves to the half-open
/// datetime interval `[start, end)` used to validate trips.
///
/// ```
/// use taxi_demand::Month;
///
/// let december = Month(2022, 12);
/// assert_eq!(december.to_string(), "2022-12");
/// assert_eq!(december.next(), Month(2023, 1));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    /// All twelve months of `year`.
    pub fn all_of_year(year: i32) -> Vec<Month> {
        (1..=12).map(|month| Month(year, month)).collect()
    }

    pub fn is_valid(self) -> bool {
        NaiveDate::from_ymd_opt(self.0, self.1, 1).is_some()
    }

    /// The following month, rolling December over into January.
    pub fn next(self) -> Month {
        if self.1 >= 12 {
            Month(self.0 + 1, 1)
        } else {
            Month(self.0, self.1 + 1)
        }
    }

    /// First instant of the month (inclusive bound).
    pub fn start(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.0, self.1, 1)?.and_hms_opt(0, 0, 0)
    }

    /// First instant of the next month (exclusive bound).
    pub fn end(self) -> Option<NaiveDateTime> {
        if !self.is_valid() {
            return None;
        }
        self.next().start()
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}
