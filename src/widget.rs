use crate::layout::{CellStyle, GridCell, MonthGrid};
use crate::theme::{
    cell_style, BASE_STYLE, FOOTER_STYLE, HAS_EVENTS_STYLE, MONTH_STYLE, WEEKDAY_STYLE,
};
use ratatui::{prelude::*, widgets::*};

static HEADER: &str = " Mo     Tu     We     Th     Fr     Sa     Su   ";

pub(crate) static NO_EVENTS: &str = "No events today";

/// Width of the month view in columns
const MAIN_WIDTH: u16 = 48;

/// Column at which the month label, summary, and footer start, lining them
/// up with the weekday names
const TEXT_INDENT: u16 = 1;

/// Lines above the grid: month label, today summary, today's event, weekday
/// header, and its rule
const HEADER_LINES: u16 = 5;

/// Number of lines taken up by each week: day numbers, then event titles
const WEEK_LINES: u16 = 2;

/// Number of columns per day of week
const DAY_WIDTH: u16 = 7;

/// Widest an event title may be drawn beneath its day
const TITLE_WIDTH: u16 = DAY_WIDTH - 1;

// Six weeks of grid above the footer
const FOOTER_LINE: u16 = HEADER_LINES + WEEK_LINES * 6;

const ACS_HLINE: char = '─';

/// Draws a [`MonthGrid`] as a fixed six-week calendar page
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct MonthView<'a> {
    grid: &'a MonthGrid,
    updated: Option<&'a str>,
}

impl<'a> MonthView<'a> {
    pub(crate) fn new(grid: &'a MonthGrid) -> Self {
        MonthView {
            grid,
            updated: None,
        }
    }

    /// Show "Updated: {updated}" beneath the grid
    pub(crate) fn updated(mut self, updated: &'a str) -> Self {
        self.updated = Some(updated);
        self
    }
}

impl Widget for MonthView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let left = area.width.saturating_sub(MAIN_WIDTH) / 2;
        let [_, area, _] = Layout::horizontal([
            Constraint::Length(left),
            Constraint::Length(MAIN_WIDTH.min(area.width)),
            Constraint::Min(0),
        ])
        .areas(area);
        let mut canvas = BufferCanvas::new(area, buf);
        canvas.mvprint(0, TEXT_INDENT, &self.grid.month_label, Some(MONTH_STYLE));
        canvas.mvprint(1, TEXT_INDENT, &self.grid.today_summary, Some(BASE_STYLE));
        match &self.grid.today_event {
            Some(title) => canvas.mvprint(2, TEXT_INDENT, title, Some(HAS_EVENTS_STYLE)),
            None => canvas.mvprint(2, TEXT_INDENT, NO_EVENTS, Some(FOOTER_STYLE)),
        }
        canvas.mvprint(3, 0, HEADER, Some(WEEKDAY_STYLE));
        canvas.hline(4, 0, ACS_HLINE, MAIN_WIDTH);
        for cell in self.grid.day_cells() {
            canvas.draw_cell(cell);
        }
        if let Some(updated) = self.updated {
            canvas.mvprint(
                FOOTER_LINE,
                TEXT_INDENT,
                format!("Updated: {updated}"),
                Some(FOOTER_STYLE),
            );
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_cell(&mut self, cell: &GridCell) {
        let (Some(day), Some(style)) = (cell.day, cell.style) else {
            return;
        };
        let (Ok(row), Ok(col)) = (u16::try_from(cell.row), u16::try_from(cell.col)) else {
            return;
        };
        let y = HEADER_LINES + row * WEEK_LINES;
        let x = col * DAY_WIDTH;
        let s = if style == CellStyle::Today {
            format!("[{day:2}]")
        } else {
            format!(" {day:2} ")
        };
        self.mvprint(y, x, s, Some(cell_style(style)));
        if let Some(title) = cell.title() {
            self.mvprintn(y + 1, x, title, Some(cell_style(style)), TITLE_WIDTH);
        }
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Option<Style>) {
        self.mvprintn(y, x, s, style, u16::MAX);
    }

    fn mvprintn<S: AsRef<str>>(
        &mut self,
        y: u16,
        x: u16,
        s: S,
        style: Option<Style>,
        max_width: u16,
    ) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style.unwrap_or_default());
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // calendar's area, though we need to be sure that the Rect passed
            // to the Paragraph is entirely within the frame lest a panic
            // result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width).min(max_width),
                    height: 1,
                },
                self.buf,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, String::from(ch).repeat(length.into()), None);
    }
}
