use crate::store::{Preferences, NEXT_EVENT_TITLE};
use crate::theme::{BASE_STYLE, TODAY_STYLE, WEEKDAY_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Flex, Layout, Rect},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Widget},
};
use std::fmt;
use time::Date;

pub(crate) static NO_DATA: &str = "No data available";

const OUTER_WIDTH: u16 = 24;
const OUTER_HEIGHT: u16 = 5;

/// The small "today at a glance" widget: abbreviated weekday, day of month,
/// and the headline of the next event
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CompactSummary {
    weekday: String,
    day: u8,
    content: String,
}

impl CompactSummary {
    pub(crate) fn new(today: Date, prefs: &Preferences) -> CompactSummary {
        let content = prefs
            .get_text(NEXT_EVENT_TITLE)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_DATA);
        CompactSummary {
            weekday: today.weekday().to_string().chars().take(3).collect(),
            day: today.day(),
            content: content.to_owned(),
        }
    }
}

impl fmt::Display for CompactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\n{}", self.weekday, self.day, self.content)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Compact<'a>(pub(crate) &'a CompactSummary);

impl Widget for Compact<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [outer_area] = Layout::horizontal([OUTER_WIDTH.min(area.width)])
            .flex(Flex::Center)
            .areas(area);
        let [outer_area] = Layout::vertical([OUTER_HEIGHT.min(area.height)])
            .flex(Flex::Center)
            .areas(outer_area);
        Clear.render(outer_area, buf);
        let text = Text::from_iter([
            Line::styled(self.0.weekday.as_str(), WEEKDAY_STYLE),
            Line::styled(self.0.day.to_string(), TODAY_STYLE),
            Line::styled(self.0.content.as_str(), BASE_STYLE),
        ]);
        Paragraph::new(text)
            .block(Block::bordered().title(" Today ").style(BASE_STYLE))
            .render(outer_area, buf);
    }
}
