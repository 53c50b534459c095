use ratatui::style::{Color, Modifier, Style};

use crate::core::config::ThemeName;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    // Overall background color to paint the full frame
    pub background_color: Color,

    // Transcript
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_text_style: Style,
    pub stage_header_style: Style,
    pub stage_loading_style: Style,
    pub tab_active_style: Style,
    pub tab_inactive_style: Style,
    pub ranking_style: Style,
    pub error_style: Style,

    // Chrome
    pub title_style: Style,
    pub outline_style: Style,
    pub outline_active_style: Style,
    pub status_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub input_cursor_line_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            name: ThemeName::Dark,
            background_color: Color::Rgb(0x1a, 0x1b, 0x26),
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_text_style: Style::default().fg(Color::White),
            stage_header_style: Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            stage_loading_style: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
            tab_active_style: Style::default()
                .fg(Color::Black)
                .bg(Color::LightMagenta),
            tab_inactive_style: Style::default().fg(Color::Gray),
            ranking_style: Style::default().fg(Color::LightBlue),
            error_style: Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),

            title_style: Style::default().fg(Color::Gray),
            outline_style: Style::default().fg(Color::DarkGray),
            outline_active_style: Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            status_style: Style::default().fg(Color::DarkGray),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),

            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            input_cursor_line_style: Style::default(),
        }
    }

    pub fn light() -> Self {
        Theme {
            name: ThemeName::Light,
            background_color: Color::Rgb(0xfa, 0xfa, 0xf7),
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Blue),
            assistant_text_style: Style::default().fg(Color::Black),
            stage_header_style: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            stage_loading_style: Style::default()
                .fg(Color::Rgb(0x9a, 0x67, 0x00))
                .add_modifier(Modifier::ITALIC),
            tab_active_style: Style::default().fg(Color::White).bg(Color::Magenta),
            tab_inactive_style: Style::default().fg(Color::DarkGray),
            ranking_style: Style::default().fg(Color::Blue),
            error_style: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),

            title_style: Style::default().fg(Color::DarkGray),
            outline_style: Style::default().fg(Color::Gray),
            outline_active_style: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            status_style: Style::default().fg(Color::Gray),
            input_border_style: Style::default().fg(Color::Black),
            input_title_style: Style::default().fg(Color::DarkGray),

            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            input_cursor_line_style: Style::default(),
        }
    }

    pub fn for_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark_default(),
            ThemeName::Light => Self::light(),
        }
    }
}
