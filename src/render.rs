use crate::help::Help;
use crate::layout::{CellStyle, MonthGrid};
use crate::summary::{Compact, CompactSummary};
use crate::theme::BASE_STYLE;
use crate::widget::{MonthView, NO_EVENTS};
use ratatui::{backend::Backend, buffer::Buffer, layout::Rect, widgets::Widget, Terminal};
use std::io::{self, Write};
use time::{macros::format_description, OffsetDateTime};

/// Something that can display a freshly computed month grid.  It is handed
/// the whole grid on every refresh and must not assume anything about the
/// previous one.
pub(crate) trait RenderSink {
    type Error;

    fn render(&mut self, grid: &MonthGrid) -> Result<(), Self::Error>;
}

/// Format the "last updated" stamp shown under the grid, e.g. `10/18 09:30`
pub(crate) fn updated_label(now: OffsetDateTime) -> String {
    match now.format(format_description!("[month]/[day] [hour]:[minute]")) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("failed to format update time: {e}");
            String::new()
        }
    }
}

/// Writes grids as plain text, one call per grid
#[derive(Debug)]
pub(crate) struct TextSink<W> {
    out: W,
    updated: Option<String>,
}

impl<W: Write> TextSink<W> {
    pub(crate) fn new(out: W) -> Self {
        TextSink { out, updated: None }
    }

    pub(crate) fn updated(mut self, updated: String) -> Self {
        self.updated = Some(updated);
        self
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderSink for TextSink<W> {
    type Error = io::Error;

    fn render(&mut self, grid: &MonthGrid) -> io::Result<()> {
        writeln!(self.out, "{}", grid.month_label)?;
        writeln!(self.out, "{}", grid.today_summary)?;
        writeln!(
            self.out,
            "{}",
            grid.today_event.as_deref().unwrap_or(NO_EVENTS)
        )?;
        writeln!(self.out)?;
        writeln!(self.out, " Mo  Tu  We  Th  Fr  Sa  Su")?;
        for row in grid.rows().take(grid.rows_used()) {
            let mut line = String::new();
            for cell in row {
                line.push_str(&match (cell.day, cell.style) {
                    (Some(day), Some(CellStyle::Today)) => format!("[{day:2}]"),
                    (Some(day), Some(CellStyle::HasEvents)) => format!(" {day:2}*"),
                    (Some(day), _) => format!(" {day:2} "),
                    (None, _) => String::from("    "),
                });
            }
            writeln!(self.out, "{}", line.trim_end())?;
        }
        let titled = grid
            .day_cells()
            .filter_map(|c| Some((c.day?, c.title()?)))
            .collect::<Vec<_>>();
        if !titled.is_empty() {
            writeln!(self.out)?;
            for (day, title) in titled {
                writeln!(self.out, "{day:3}  {title}")?;
            }
        }
        if let Some(ref updated) = self.updated {
            writeln!(self.out)?;
            writeln!(self.out, "Updated: {updated}")?;
        }
        self.out.flush()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum Mode {
    #[default]
    Month,
    Compact,
}

/// Everything that ends up on the terminal: the latest grid, the compact
/// summary, and whatever overlay is open
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Screen {
    pub(crate) grid: Option<MonthGrid>,
    pub(crate) compact: Option<CompactSummary>,
    pub(crate) updated: String,
    pub(crate) mode: Mode,
    pub(crate) helping: bool,
}

impl Widget for &Screen {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        match (self.mode, &self.grid, &self.compact) {
            (Mode::Compact, _, Some(summary)) => Compact(summary).render(area, buf),
            (_, Some(grid), _) => MonthView::new(grid)
                .updated(&self.updated)
                .render(area, buf),
            _ => (),
        }
        if self.helping {
            Help(BASE_STYLE).render(area, buf);
        }
    }
}

/// Draws grids onto a ratatui terminal, keeping the last one around so the
/// screen can be repainted after a resize or an overlay change
#[derive(Debug)]
pub(crate) struct TerminalSink<B: Backend> {
    terminal: Terminal<B>,
    screen: Screen,
}

impl<B: Backend> TerminalSink<B> {
    pub(crate) fn new(terminal: Terminal<B>) -> Self {
        TerminalSink {
            terminal,
            screen: Screen::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn screen(&self) -> &Screen {
        &self.screen
    }

    pub(crate) fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub(crate) fn redraw(&mut self) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        let screen = &self.screen;
        self.terminal
            .draw(|frame| frame.render_widget(screen, frame.area()))?;
        Ok(())
    }
}

impl<B: Backend> RenderSink for TerminalSink<B>
where
    io::Error: From<B::Error>,
{
    type Error = io::Error;

    fn render(&mut self, grid: &MonthGrid) -> io::Result<()> {
        self.screen.grid = Some(grid.clone());
        self.redraw()
    }
}
