use crate::domain::model::WindowKind;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveTime, Offset, TimeDelta, Utc,
    Weekday,
};

/// Fixed calendar conventions for window boundaries.
///
/// The offset and first weekday are configuration, never the process locale,
/// so the same reference instant always yields the same windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
    week_start: Weekday,
}

/// Inclusive on both ends. `Unbounded` is the "total" window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Bounded {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Unbounded,
}

impl TimeWindow {
    /// An absent timestamp only falls in the unbounded window.
    pub fn contains(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        match (self, timestamp) {
            (TimeWindow::Unbounded, _) => true,
            (TimeWindow::Bounded { start, end }, Some(ts)) => *start <= ts && ts <= *end,
            (TimeWindow::Bounded { .. }, None) => false,
        }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::Bounded { start, .. } => Some(*start),
            TimeWindow::Unbounded => None,
        }
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::Bounded { end, .. } => Some(*end),
            TimeWindow::Unbounded => None,
        }
    }
}

impl Calendar {
    pub fn new(offset: FixedOffset, week_start: Weekday) -> Self {
        Self { offset, week_start }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// 參考時間點在本地時區的日期
    pub fn local_date(&self, reference: DateTime<Utc>) -> NaiveDate {
        reference.with_timezone(&self.offset).date_naive()
    }

    /// The UTC instant of local midnight starting `date`.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN)
            - TimeDelta::seconds(i64::from(self.offset.local_minus_utc()));
        naive.and_utc()
    }

    pub fn start_of_day(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        self.local_midnight(self.local_date(reference))
    }

    pub fn window(&self, kind: WindowKind, reference: DateTime<Utc>) -> TimeWindow {
        let date = self.local_date(reference);
        let (first, next) = match kind {
            WindowKind::Total => return TimeWindow::Unbounded,
            WindowKind::Day => (date, date + Days::new(1)),
            WindowKind::Week => {
                let back = (7 + date.weekday().num_days_from_monday()
                    - self.week_start.num_days_from_monday())
                    % 7;
                let first = date - Days::new(u64::from(back));
                (first, first + Days::new(7))
            }
            WindowKind::Month => {
                let first = date - Days::new(u64::from(date.day0()));
                (first, first + Months::new(1))
            }
        };

        TimeWindow::Bounded {
            start: self.local_midnight(first),
            end: self.local_midnight(next) - TimeDelta::nanoseconds(1),
        }
    }
}

impl Default for Calendar {
    /// UTC, weeks starting on Sunday.
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            week_start: Weekday::Sun,
        }
    }
}

pub fn in_window(
    timestamp: Option<DateTime<Utc>>,
    kind: WindowKind,
    reference: DateTime<Utc>,
    calendar: &Calendar,
) -> bool {
    calendar.window(kind, reference).contains(timestamp)
}
