use chrono::{Datelike, Duration, NaiveDate};

use crate::events::{EventStore, date_key, parse_date_key};

pub const GRID_COLUMNS: usize = 7;
pub const GRID_ROWS: usize = 6;
pub const GRID_CELLS: usize = GRID_COLUMNS * GRID_ROWS;

pub const WEEKDAY_HEADER: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// The month the calendar card currently shows. Month index is zero-based
/// and always normalized back into `[0, 11]` with year carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarModel {
    year: i32,
    month0: u32,
}

impl CalendarModel {
    pub fn for_today(today: NaiveDate) -> Self {
        Self {
            year: today.year(),
            month0: today.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month0(&self) -> u32 {
        self.month0
    }

    pub fn next(&mut self) {
        self.shift(1);
    }

    pub fn previous(&mut self) {
        self.shift(-1);
    }

    fn shift(&mut self, delta: i32) {
        let mut month = self.month0 as i32 + delta;
        while month > 11 {
            month -= 12;
            self.year += 1;
        }
        while month < 0 {
            month += 12;
            self.year -= 1;
        }
        self.month0 = month as u32;
    }

    pub fn title(&self) -> String {
        self.first_of_month().format("%B %Y").to_string()
    }

    /// Always exactly 42 cells, Monday-first. Leading cells before day 1 and
    /// trailing cells after the last day stay empty so the grid height never
    /// changes between months.
    pub fn build_grid(&self, events: &EventStore, today: NaiveDate) -> MonthGrid {
        let first = self.first_of_month();
        let lead = ((first.weekday().num_days_from_sunday() + 6) % 7) as usize;
        let days = days_in_month(self.year, self.month0 + 1);

        let mut cells = Vec::with_capacity(GRID_CELLS);
        for _ in 0..lead {
            cells.push(None);
        }
        for day in 1..=days {
            let date = NaiveDate::from_ymd_opt(self.year, self.month0 + 1, day)
                .expect("calendar day must be valid");
            let key = date_key(date);
            let titles = events.get(&key);
            cells.push(Some(DayCell {
                day,
                first_title: titles.first().cloned(),
                has_event: !titles.is_empty(),
                is_today: date == today,
                date_key: key,
            }));
        }
        while cells.len() % GRID_COLUMNS != 0 {
            cells.push(None);
        }
        while cells.len() < GRID_CELLS {
            cells.push(None);
        }

        MonthGrid { cells }
    }

    fn first_of_month(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1)
            .expect("first day of month must be valid")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub day: u32,
    pub date_key: String,
    pub first_title: Option<String>,
    pub has_event: bool,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub cells: Vec<Option<DayCell>>,
}

impl MonthGrid {
    pub fn rows(&self) -> impl Iterator<Item = &[Option<DayCell>]> {
        self.cells.chunks(GRID_COLUMNS)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&DayCell> {
        if column >= GRID_COLUMNS {
            return None;
        }
        self.cells
            .get(row * GRID_COLUMNS + column)
            .and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingEntry {
    pub date: NaiveDate,
    pub date_key: String,
    pub title: String,
}

/// Derived view over the event store: days on or after `today`, ascending,
/// capped at `limit`. Unparseable keys in persisted data are skipped rather
/// than failing the whole projection. Recomputed from scratch on demand.
pub fn upcoming(events: &EventStore, today: NaiveDate, limit: usize) -> Vec<UpcomingEntry> {
    let mut entries = Vec::new();
    for (key, titles) in events.all() {
        let Some(date) = parse_date_key(key) else {
            continue;
        };
        let Some(title) = titles.first() else {
            continue;
        };
        if date >= today {
            entries.push(UpcomingEntry {
                date,
                date_key: key.clone(),
                title: title.clone(),
            });
        }
    }

    entries.sort_by_key(|entry| entry.date);
    entries.truncate(limit);
    entries
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("next year date should be valid")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).expect("next month date should be valid")
    };
    (first_of_next - Duration::days(1)).day()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::events::EventStore;
    use crate::storage::MemoryStore;

    use super::{CalendarModel, GRID_CELLS, upcoming};

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("test date must be valid")
    }

    fn month(year: i32, month1: u32) -> CalendarModel {
        CalendarModel::for_today(day(year, month1, 1))
    }

    #[test]
    fn grid_always_has_42_cells() {
        let store = MemoryStore::new();
        let events = EventStore::load(&store);
        let today = day(2024, 6, 15);

        for year in [2023, 2024, 2025] {
            for month1 in 1..=12 {
                let grid = month(year, month1).build_grid(&events, today);
                assert_eq!(grid.cells.len(), GRID_CELLS, "{year}-{month1}");
            }
        }
    }

    #[test]
    fn february_day_counts_cover_leap_and_common_years() {
        let store = MemoryStore::new();
        let events = EventStore::load(&store);
        let today = day(2024, 6, 15);

        let leap = month(2024, 2).build_grid(&events, today);
        assert_eq!(leap.cells.iter().flatten().count(), 29);

        let common = month(2023, 2).build_grid(&events, today);
        assert_eq!(common.cells.iter().flatten().count(), 28);
    }

    #[test]
    fn grid_is_monday_first() {
        let store = MemoryStore::new();
        let events = EventStore::load(&store);

        // February 2024 starts on a Thursday: three leading empty cells.
        let grid = month(2024, 2).build_grid(&events, day(2024, 2, 1));
        assert!(grid.cells[..3].iter().all(Option::is_none));
        assert_eq!(grid.cells[3].as_ref().map(|cell| cell.day), Some(1));

        // September 2025 starts on a Monday: day 1 sits in the first cell.
        let grid = month(2025, 9).build_grid(&events, day(2025, 9, 1));
        assert_eq!(grid.cells[0].as_ref().map(|cell| cell.day), Some(1));
    }

    #[test]
    fn short_months_still_render_six_rows_of_empties() {
        let store = MemoryStore::new();
        let events = EventStore::load(&store);

        // February 2021 fits exactly four Monday-first weeks.
        let grid = month(2021, 2).build_grid(&events, day(2021, 2, 1));
        assert_eq!(grid.cells.len(), GRID_CELLS);
        assert!(grid.cells[28..].iter().all(Option::is_none));
    }

    #[test]
    fn cells_carry_event_and_today_flags() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::load(&store);
        events.edit(&mut store, "2026-03-10", Some("Dentist"));

        let grid = month(2026, 3).build_grid(&events, day(2026, 3, 4));
        let cell_for = |wanted: u32| {
            grid.cells
                .iter()
                .flatten()
                .find(|cell| cell.day == wanted)
                .expect("day cell should exist")
        };

        let marked = cell_for(10);
        assert!(marked.has_event);
        assert_eq!(marked.first_title.as_deref(), Some("Dentist"));
        assert!(!marked.is_today);

        let today_cell = cell_for(4);
        assert!(today_cell.is_today);
        assert!(!today_cell.has_event);
    }

    #[test]
    fn twelve_nexts_advance_exactly_one_year() {
        for start in [month(2024, 1), month(2024, 6), month(2024, 12)] {
            let mut cursor = start;
            for _ in 0..12 {
                cursor.next();
            }
            assert_eq!(cursor.month0(), start.month0());
            assert_eq!(cursor.year(), start.year() + 1);
        }
    }

    #[test]
    fn previous_is_the_exact_inverse_of_next() {
        let mut cursor = month(2024, 1);
        cursor.previous();
        assert_eq!((cursor.year(), cursor.month0()), (2023, 11));
        cursor.next();
        assert_eq!((cursor.year(), cursor.month0()), (2024, 0));
    }

    #[test]
    fn upcoming_filters_sorts_and_truncates() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::load(&store);
        events.edit(&mut store, "2024-03-10", Some("Past"));
        events.edit(&mut store, "2024-04-01", Some("Trip"));
        events.edit(&mut store, "2024-03-20", Some("Dentist"));

        let entries = upcoming(&events, day(2024, 3, 15), 10);
        let keys = entries
            .iter()
            .map(|entry| entry.date_key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, ["2024-03-20", "2024-04-01"]);

        let capped = upcoming(&events, day(2024, 3, 15), 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].title, "Dentist");
    }

    #[test]
    fn upcoming_includes_today_and_skips_malformed_keys() {
        let store = MemoryStore::seed(
            crate::storage::EVENTS_KEY,
            r#"{"2024-03-15":["Today"],"garbage":["Lost"],"2024-03-16":["Tomorrow"]}"#,
        );
        let events = EventStore::load(&store);

        let entries = upcoming(&events, day(2024, 3, 15), 10);
        let titles = entries
            .iter()
            .map(|entry| entry.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["Today", "Tomorrow"]);
    }
}
