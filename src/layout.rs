use crate::datekey::DateKey;
use crate::store::EventStore;
use std::array::from_fn;
use time::{Date, Month};

/// Number of week rows in a month view.  No Gregorian month needs more than
/// six when weeks start on Monday: 31 days after up to six leading blanks is
/// at most 37 of the 42 cells.
pub(crate) const ROWS: usize = 6;

/// Number of columns per week row, Monday through Sunday
pub(crate) const COLS: usize = 7;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum CellStyle {
    Today,
    HasEvents,
    Regular,
}

/// One position in the month grid.  Blank cells (before the first or after
/// the last day of the month) have no day, no text, and no style.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct GridCell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) day: Option<u8>,
    pub(crate) display_text: String,
    pub(crate) style: Option<CellStyle>,
}

impl GridCell {
    fn blank(row: usize, col: usize) -> GridCell {
        GridCell {
            row,
            col,
            day: None,
            display_text: String::new(),
            style: None,
        }
    }

    fn with_day(row: usize, col: usize, day: u8, title: &str, style: CellStyle) -> GridCell {
        let display_text = if title.is_empty() {
            day.to_string()
        } else {
            format!("{day}\n{title}")
        };
        GridCell {
            row,
            col,
            day: Some(day),
            display_text,
            style: Some(style),
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.day.is_none()
    }

    /// The event title portion of the display text, if any
    pub(crate) fn title(&self) -> Option<&str> {
        self.display_text.split_once('\n').map(|(_, title)| title)
    }
}

/// A fully computed month view, ready to be handed to a render sink
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MonthGrid {
    pub(crate) today: Date,
    pub(crate) cells: [[GridCell; COLS]; ROWS],
    /// Month name and year, e.g. "October 2026"
    pub(crate) month_label: String,
    /// Weekday, month, and day of today, e.g. "Sunday, October 18"
    pub(crate) today_summary: String,
    /// Title of today's event, if the store has one
    pub(crate) today_event: Option<String>,
}

impl MonthGrid {
    #[cfg(test)]
    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &[GridCell; COLS]> + '_ {
        self.cells.iter()
    }

    /// All non-blank cells in row-major order
    pub(crate) fn day_cells(&self) -> impl Iterator<Item = &GridCell> + '_ {
        self.cells.iter().flatten().filter(|c| !c.is_blank())
    }

    /// Number of rows containing at least one day of the month
    pub(crate) fn rows_used(&self) -> usize {
        self.cells
            .iter()
            .filter(|r| r.iter().any(|c| !c.is_blank()))
            .count()
    }
}

/// Compute the month view for the month containing `today`.
///
/// Cells are filled row-major starting at column [`month_offset`] of the
/// first row.  Each day is looked up in `store`; its text is the day number,
/// followed by a newline and the event title when the title is non-empty.
/// Today's cell is always styled `Today`, taking precedence over
/// `HasEvents`.
///
/// The result depends only on `today` and the store's contents, so calling
/// this twice with the same inputs yields identical grids.
pub(crate) fn month_grid<S: EventStore + ?Sized>(today: Date, store: &S) -> MonthGrid {
    let year = today.year();
    let month = today.month();
    let month0 = u8::from(month) - 1;
    let offset = usize::from(month_offset(today));
    let max_day = days_in_month(today);
    let cells: [[GridCell; COLS]; ROWS] = from_fn(|row| {
        from_fn(|col| {
            let day = (row * COLS + col)
                .checked_sub(offset)
                .and_then(|i| (1..=max_day).nth(i));
            match day {
                Some(day) => {
                    let record = store.lookup(&DateKey::encode(year, month0, day));
                    let style = if day == today.day() {
                        CellStyle::Today
                    } else if record.has_events {
                        CellStyle::HasEvents
                    } else {
                        CellStyle::Regular
                    };
                    GridCell::with_day(row, col, day, &record.title, style)
                }
                None => GridCell::blank(row, col),
            }
        })
    });
    // Today's title comes through the same lookup as every cell, so a title
    // stored under a cleared `has_events_*` flag is not shown here either
    let today_event = Some(store.lookup(&DateKey::for_date(today)).title).filter(|t| !t.is_empty());
    MonthGrid {
        today,
        cells,
        month_label: month_label(year, month),
        today_summary: format!("{}, {} {}", today.weekday(), month, today.day()),
        today_event,
    }
}

fn month_label(year: i32, month: Month) -> String {
    format!("{month} {year:04}")
}

/// Column (Monday = 0 … Sunday = 6) in which the first day of `date`'s
/// month falls
pub(crate) fn month_offset(date: Date) -> u8 {
    let weekday = date.weekday().number_days_from_monday();
    let back = (date.day() - 1) % 7;
    (weekday + 7 - back) % 7
}

/// Number of days in the month containing `date`
pub(crate) fn days_in_month(date: Date) -> u8 {
    date.month().length(date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Preferences};
    use proptest::prelude::*;
    use std::iter::successors;
    use time::macros::date;
    use time::Weekday;

    fn empty_grid(today: Date) -> MonthGrid {
        month_grid(today, &MemoryStore::new())
    }

    #[test]
    fn test_offset_by_weekday() {
        // 2024-01-01 was a Monday
        assert_eq!(month_offset(date!(2024 - 01 - 01)), 0);
        assert_eq!(month_offset(date!(2024 - 01 - 17)), 0);
        // 2026-03-01 is a Sunday
        assert_eq!(month_offset(date!(2026 - 03 - 01)), 6);
        assert_eq!(month_offset(date!(2026 - 03 - 31)), 6);
        // 2025-10-01 was a Wednesday
        assert_eq!(month_offset(date!(2025 - 10 - 01)), 2);
        assert_eq!(month_offset(date!(2025 - 10 - 22)), 2);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(date!(2024 - 02 - 10)), 29);
        assert_eq!(days_in_month(date!(2023 - 02 - 10)), 28);
        assert_eq!(days_in_month(date!(1900 - 02 - 01)), 28);
        assert_eq!(days_in_month(date!(2000 - 02 - 28)), 29);
        assert_eq!(days_in_month(date!(2026 - 04 - 30)), 30);
        assert_eq!(days_in_month(date!(2026 - 12 - 01)), 31);
    }

    #[test]
    fn test_leap_february() {
        assert_eq!(empty_grid(date!(2024 - 02 - 15)).day_cells().count(), 29);
        assert_eq!(empty_grid(date!(2023 - 02 - 15)).day_cells().count(), 28);
    }

    #[test]
    fn test_sunday_start_uses_six_rows() {
        let grid = empty_grid(date!(2026 - 03 - 18));
        assert_eq!(grid.rows_used(), 6);
        let first = grid.cell(0, 6).unwrap();
        assert_eq!(first.day, Some(1));
        assert!(grid.cell(0, 5).unwrap().is_blank());
        let last = grid.cell(5, 1).unwrap();
        assert_eq!(last.day, Some(31));
        assert!(grid.cell(5, 2).unwrap().is_blank());
        assert_eq!(grid.cell(6, 0), None);
        assert_eq!(grid.cell(0, 7), None);
    }

    #[test]
    fn test_february_starting_monday_uses_four_rows() {
        // 2021-02-01 was a Monday and 2021 was not a leap year
        let grid = empty_grid(date!(2021 - 02 - 01));
        assert_eq!(grid.rows_used(), 4);
        assert_eq!(grid.cell(0, 0).unwrap().day, Some(1));
        assert_eq!(grid.cell(3, 6).unwrap().day, Some(28));
    }

    #[test]
    fn test_today_overrides_has_events() {
        let today = date!(2024 - 02 - 15);
        let mut store = MemoryStore::new();
        store.insert(today, true, "Dentist");
        store.insert(date!(2024 - 02 - 16), true, "Gym");
        store.insert(date!(2024 - 02 - 17), false, "");
        let grid = month_grid(today, &store);
        // 2024-02-01 was a Thursday
        let cell = grid.cell(2, 3).unwrap();
        assert_eq!(cell.day, Some(15));
        assert_eq!(cell.style, Some(CellStyle::Today));
        assert_eq!(cell.display_text, "15\nDentist");
        let cell = grid.cell(2, 4).unwrap();
        assert_eq!(cell.day, Some(16));
        assert_eq!(cell.style, Some(CellStyle::HasEvents));
        assert_eq!(cell.title(), Some("Gym"));
        let cell = grid.cell(2, 5).unwrap();
        assert_eq!(cell.style, Some(CellStyle::Regular));
        assert_eq!(cell.display_text, "17");
        assert_eq!(grid.today_event.as_deref(), Some("Dentist"));
    }

    #[test]
    fn test_has_events_without_title() {
        let mut store = MemoryStore::new();
        store.insert(date!(2024 - 03 - 15), true, "");
        let grid = month_grid(date!(2024 - 03 - 01), &store);
        let cell = grid.day_cells().find(|c| c.day == Some(15)).unwrap();
        assert_eq!(cell.display_text, "15");
        assert_eq!(cell.title(), None);
        assert_eq!(cell.style, Some(CellStyle::HasEvents));
    }

    #[test]
    fn test_blank_cells_carry_nothing() {
        let grid = empty_grid(date!(2026 - 03 - 18));
        for cell in grid.cells.iter().flatten().filter(|c| c.is_blank()) {
            assert_eq!(cell.display_text, "");
            assert_eq!(cell.style, None);
        }
    }

    #[test]
    fn test_labels() {
        let grid = empty_grid(date!(2026 - 10 - 18));
        assert_eq!(grid.month_label, "October 2026");
        assert_eq!(grid.today_summary, "Sunday, October 18");
        assert_eq!(grid.today_event, None);
    }

    #[test]
    fn test_cells_know_their_position() {
        let grid = empty_grid(date!(2026 - 10 - 18));
        for (r, row) in grid.rows().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                assert_eq!((cell.row, cell.col), (r, c));
            }
        }
    }

    fn any_date() -> impl Strategy<Value = Date> {
        (1583i32..2500, 1u8..=12, 1u8..=31).prop_filter_map("invalid date", |(y, m, d)| {
            let month = Month::try_from(m).ok()?;
            Date::from_calendar_date(y, month, d).ok()
        })
    }

    proptest! {
        #[test]
        fn prop_day_cells_match_month_length(today in any_date()) {
            let grid = empty_grid(today);
            let first = today.replace_day(1).unwrap();
            let expected = successors(Some(first), |d| d.next_day())
                .take_while(|d| d.month() == today.month())
                .count();
            prop_assert_eq!(grid.day_cells().count(), expected);
        }

        #[test]
        fn prop_days_fill_row_major_from_offset(today in any_date()) {
            let grid = empty_grid(today);
            let first = today.replace_day(1).unwrap();
            let offset = usize::from(first.weekday().number_days_from_monday());
            prop_assert_eq!(usize::from(month_offset(today)), offset);
            let days = grid.day_cells().map(|c| (c.row * COLS + c.col, c.day)).collect::<Vec<_>>();
            for (i, (index, day)) in days.into_iter().enumerate() {
                prop_assert_eq!(index, offset + i);
                prop_assert_eq!(day.map(usize::from), Some(i + 1));
            }
        }

        #[test]
        fn prop_exactly_one_today(today in any_date()) {
            let grid = empty_grid(today);
            let todays = grid
                .day_cells()
                .filter(|c| c.style == Some(CellStyle::Today))
                .map(|c| c.day)
                .collect::<Vec<_>>();
            prop_assert_eq!(todays, vec![Some(today.day())]);
        }

        #[test]
        fn prop_idempotent(today in any_date(), marked in proptest::collection::vec(1u8..=28, 0..10)) {
            let mut store = MemoryStore::new();
            for d in marked {
                let date = today.replace_day(d).unwrap();
                store.insert(date, true, &format!("event {d}"));
            }
            prop_assert_eq!(month_grid(today, &store), month_grid(today, &store));
        }
    }

    #[test]
    fn test_today_title_needs_flag() {
        let mut prefs = Preferences::new();
        prefs.set_text("event_title_2026-10-18", "Cancelled brunch");
        let grid = month_grid(date!(2026 - 10 - 18), &prefs);
        assert_eq!(grid.today_event, None);
        prefs.set_bool("has_events_2026-10-18", true);
        let grid = month_grid(date!(2026 - 10 - 18), &prefs);
        assert_eq!(grid.today_event.as_deref(), Some("Cancelled brunch"));
    }

    #[test]
    fn test_days_in_month_every_month() {
        let lengths = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (m, len) in (1u8..=12).zip(lengths) {
            let month = Month::try_from(m).unwrap();
            let date = Date::from_calendar_date(2026, month, 15).unwrap();
            assert_eq!(days_in_month(date), len, "{month} 2026");
        }
    }

    #[test]
    fn test_sunday_first_mapping_agrees() {
        // The Sunday=1..Saturday=7 rule: Sunday -> 6, otherwise dow - 2
        for wd in [
            Weekday::Sunday,
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
        ] {
            let sunday_first = wd.number_from_sunday();
            let expected = if wd == Weekday::Sunday {
                6
            } else {
                sunday_first - 2
            };
            assert_eq!(wd.number_days_from_monday(), expected);
        }
    }
}
