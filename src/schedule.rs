//! Classification of tasks into today's workflow and the upcoming list.
//!
//! Everything here is a pure function of the task list and a [`Reference`]
//! instant. Nothing returns an error: a due date that cannot be parsed simply
//! keeps the task out of both views.
//!
//! Placement rules, by the calendar day of the due date in the reference offset:
//!
//! | due day        | status        | placement  |
//! |----------------|---------------|------------|
//! | today          | any           | active     |
//! | before today   | not Completed | active     |
//! | before today   | Completed     | hidden     |
//! | after today    | any           | upcoming   |
//!
//! The upcoming list has no horizon; anything dated after today is included.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::clock::Clock;
use crate::task::{Difficulty, Status, Task};

const FLOATING_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// The "now" that classification is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    now: DateTime<FixedOffset>,
}

impl Reference {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.now())
    }

    /// Midnight at the start of `day` in `offset`.
    pub fn start_of(day: NaiveDate, offset: FixedOffset) -> Option<Self> {
        day.and_time(NaiveTime::MIN)
            .and_local_timezone(offset)
            .single()
            .map(Self::new)
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    pub fn offset(&self) -> FixedOffset {
        *self.now.offset()
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Interprets a stored due date in the reference offset.
    pub fn localize(&self, raw: &str) -> Option<NaiveDateTime> {
        Due::parse(raw).map(|due| due.local(&self.offset()))
    }
}

/// A parsed due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    /// Calendar date only; read as local midnight.
    Day(NaiveDate),
    /// Date and time without an offset; read as local time.
    Floating(NaiveDateTime),
    /// Absolute instant with an explicit offset.
    Instant(DateTime<FixedOffset>),
}

impl Due {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Some(Due::Instant(instant));
        }
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Due::Day(day));
        }
        FLOATING_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(Due::Floating)
    }

    /// Wall-clock value of this due date in `offset`.
    pub fn local(&self, offset: &FixedOffset) -> NaiveDateTime {
        match self {
            Due::Day(day) => day.and_time(NaiveTime::MIN),
            Due::Floating(value) => *value,
            Due::Instant(instant) => instant.with_timezone(offset).naive_local(),
        }
    }
}

/// Where a task shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Active,
    Upcoming,
    /// In neither view: past-due and completed, or an unparseable due date.
    Hidden,
}

pub fn placement(task: &Task, reference: &Reference) -> Placement {
    let due = match reference.localize(task.due_date.as_str()) {
        Some(due) => due,
        None => return Placement::Hidden,
    };
    match due.date().cmp(&reference.today()) {
        Ordering::Equal => Placement::Active,
        Ordering::Less if task.status != Status::Completed => Placement::Active,
        Ordering::Less => Placement::Hidden,
        Ordering::Greater => Placement::Upcoming,
    }
}

pub fn is_active(task: &Task, reference: &Reference) -> bool {
    placement(task, reference) == Placement::Active
}

pub fn is_upcoming(task: &Task, reference: &Reference) -> bool {
    placement(task, reference) == Placement::Upcoming
}

/// Tie-break rank: Hard=3, Medium=2, Easy=1, anything else 0.
pub fn difficulty_rank(difficulty: Option<Difficulty>) -> u8 {
    match difficulty {
        Some(Difficulty::Hard) => 3,
        Some(Difficulty::Medium) => 2,
        Some(Difficulty::Easy) => 1,
        None => 0,
    }
}

/// Upcoming order: due date-time ascending, then difficulty rank descending.
///
/// Dates compare on their full time of day. Unparseable dates sort after
/// everything else. Full ties compare equal, so a stable sort keeps input order.
pub fn compare_upcoming(a: &Task, b: &Task, reference: &Reference) -> Ordering {
    upcoming_key(a, reference).cmp(&upcoming_key(b, reference))
}

fn upcoming_key(task: &Task, reference: &Reference) -> (bool, Option<NaiveDateTime>, Reverse<u8>) {
    let due = reference.localize(task.due_date.as_str());
    (due.is_none(), due, Reverse(difficulty_rank(task.difficulty)))
}

/// Stable in-place sort by [`compare_upcoming`].
pub fn sort_upcoming(tasks: &mut [Task], reference: &Reference) {
    tasks.sort_by_cached_key(|task| upcoming_key(task, reference));
}

/// The two views of a task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Views {
    /// Today's workflow, in input order.
    pub active: Vec<Task>,
    /// Future tasks, ordered by [`compare_upcoming`].
    pub upcoming: Vec<Task>,
    /// Tasks that appear in neither view.
    pub hidden: usize,
}

pub fn classify(tasks: &[Task], reference: &Reference) -> Views {
    let mut views = Views::default();
    for task in tasks {
        match placement(task, reference) {
            Placement::Active => views.active.push(task.clone()),
            Placement::Upcoming => views.upcoming.push(task.clone()),
            Placement::Hidden => views.hidden += 1,
        }
    }
    sort_upcoming(&mut views.upcoming, reference);
    views
}
