use crate::layout::CellStyle;
use ratatui::style::{Color, Modifier, Style};

pub(crate) const BASE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

pub(crate) const TODAY_STYLE: Style = BASE_STYLE
    .fg(Color::Rgb(0xFF, 0x57, 0x22))
    .add_modifier(Modifier::BOLD);

pub(crate) const HAS_EVENTS_STYLE: Style = BASE_STYLE.fg(Color::Rgb(0x21, 0x96, 0xF3));

pub(crate) const REGULAR_STYLE: Style = BASE_STYLE.fg(Color::Rgb(0xCC, 0xCC, 0xCC));

pub(crate) const MONTH_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const WEEKDAY_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const FOOTER_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

pub(crate) fn cell_style(style: CellStyle) -> Style {
    match style {
        CellStyle::Today => TODAY_STYLE,
        CellStyle::HasEvents => HAS_EVENTS_STYLE,
        CellStyle::Regular => REGULAR_STYLE,
    }
}
