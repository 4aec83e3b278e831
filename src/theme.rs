use ratatui::style::Color;

use crate::layout::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub panel_bg: Color,
    pub panel_focused_bg: Color,
    pub panel_selected_bg: Color,
    pub border_idle: Color,
    pub border_focused: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub success: Color,
    pub error: Color,
    pub heading: Color,
    pub subheading: Color,
    pub code: Color,
    pub quote: Color,
}

// Catppuccin mocha.
const DARK: Palette = Palette {
    bg: Color::Rgb(30, 30, 46),
    panel_bg: Color::Rgb(24, 24, 36),
    panel_focused_bg: Color::Rgb(49, 50, 68),
    panel_selected_bg: Color::Rgb(69, 71, 90),
    border_idle: Color::Rgb(49, 50, 68),
    border_focused: Color::Rgb(137, 180, 250),
    text_primary: Color::Rgb(205, 214, 244),
    text_secondary: Color::Rgb(166, 173, 200),
    accent: Color::Rgb(137, 180, 250),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    heading: Color::Rgb(249, 226, 175),
    subheading: Color::Rgb(203, 166, 247),
    code: Color::Rgb(148, 226, 213),
    quote: Color::Rgb(166, 227, 161),
};

// Catppuccin latte.
const LIGHT: Palette = Palette {
    bg: Color::Rgb(239, 241, 245),
    panel_bg: Color::Rgb(230, 233, 239),
    panel_focused_bg: Color::Rgb(204, 208, 218),
    panel_selected_bg: Color::Rgb(188, 192, 204),
    border_idle: Color::Rgb(188, 192, 204),
    border_focused: Color::Rgb(30, 102, 245),
    text_primary: Color::Rgb(76, 79, 105),
    text_secondary: Color::Rgb(108, 111, 133),
    accent: Color::Rgb(30, 102, 245),
    success: Color::Rgb(64, 160, 43),
    error: Color::Rgb(210, 15, 57),
    heading: Color::Rgb(223, 142, 29),
    subheading: Color::Rgb(136, 57, 239),
    code: Color::Rgb(23, 146, 153),
    quote: Color::Rgb(64, 160, 43),
};

pub fn palette(theme: Theme) -> &'static Palette {
    match theme {
        Theme::Dark => &DARK,
        Theme::Light => &LIGHT,
    }
}
