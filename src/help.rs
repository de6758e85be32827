use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Flex, Layout, Rect},
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Widget},
};

static KEYS: &[(&str, &str)] = &[
    ("r", "Refresh now"),
    ("c", "Toggle compact view"),
    ("?", "Show this help"),
    ("q, ESC", "Quit"),
];

static DISMISS: &str = "Press the Any Key to dismiss.";

/// Popup listing the key bindings, drawn centered over whatever is beneath
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Help(pub(crate) Style);

impl Widget for Help {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = KEYS
            .iter()
            .map(|(key, what)| Line::raw(format!("{key:<16}{what}")))
            .chain([Line::default(), Line::raw(DISMISS)])
            .collect::<Text<'_>>();
        let height = u16::try_from(text.height())
            .unwrap_or(u16::MAX)
            .min(area.height)
            .saturating_add(2);
        let width = u16::try_from(text.width())
            .unwrap_or(u16::MAX)
            .min(area.width)
            .saturating_add(2);
        let [help_area] = Layout::horizontal([width]).flex(Flex::Center).areas(area);
        let [help_area] = Layout::vertical([height])
            .flex(Flex::Center)
            .areas(help_area);
        // One column of padding either side so the border does not butt up
        // against the grid
        let outer_area = Rect {
            x: help_area.x.saturating_sub(1),
            width: help_area.width.saturating_add(2),
            ..help_area
        }
        .intersection(area);
        Clear.render(outer_area, buf);
        Block::new().style(self.0).render(outer_area, buf);
        Paragraph::new(text)
            .block(
                Block::bordered()
                    .title(" Keys ")
                    .title_alignment(Alignment::Center),
            )
            .style(self.0)
            .render(help_area, buf);
    }
}
