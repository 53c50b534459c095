use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::scroll::animator::ScrollContainer;
use crate::ui::chat_loop::state::ChatState;
use crate::ui::transcript::TranscriptLayout;
use crate::ui::viewport::TranscriptViewport;

const OUTLINE_WIDTH: u16 = 26;
const MIN_WIDTH_FOR_OUTLINE: u16 = 80;
const MAX_INPUT_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatAreas {
    /// Transcript pane including its one-row title.
    pub transcript: Rect,
    pub outline: Option<Rect>,
    pub status: Rect,
    pub input: Rect,
}

impl ChatAreas {
    /// Rows available for transcript content.
    pub fn transcript_rows(&self) -> u16 {
        self.transcript.height.saturating_sub(1)
    }
}

pub fn chat_areas(area: Rect, input_lines: usize, show_outline: bool) -> ChatAreas {
    let input_height = input_lines.clamp(1, MAX_INPUT_ROWS) as u16 + 2;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(area);

    let (transcript, outline) = if show_outline && area.width >= MIN_WIDTH_FOR_OUTLINE {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(OUTLINE_WIDTH)])
            .split(rows[0]);
        (cols[0], Some(cols[1]))
    } else {
        (rows[0], None)
    };

    ChatAreas {
        transcript,
        outline,
        status: rows[1],
        input: rows[2],
    }
}

pub fn areas_for(state: &ChatState, area: Rect) -> ChatAreas {
    chat_areas(
        area,
        state.input.lines().len(),
        !state.layout().outline.is_empty(),
    )
}

/// Rows of the transcript to draw, with blank padding where the view is
/// stretched past an edge.
pub fn visible_lines(
    layout: &TranscriptLayout,
    viewport: &TranscriptViewport,
    rows: usize,
) -> Vec<Line<'static>> {
    let (top_pad, bottom_pad) = viewport.padding_rows();
    let content_rows = rows.saturating_sub(top_pad + bottom_pad);
    let start = viewport.first_row() + bottom_pad;

    let mut lines = Vec::with_capacity(rows);
    lines.extend(std::iter::repeat(Line::from("")).take(top_pad));
    lines.extend(layout.lines.iter().skip(start).take(content_rows).cloned());
    lines
}

fn outline_lines(state: &ChatState) -> Vec<Line<'static>> {
    let theme = &state.theme;
    let active = state.spy.active();
    let mut lines = Vec::new();
    let mut current_message = None;

    for entry in &state.layout().outline {
        if current_message != Some(entry.message_index) {
            if current_message.is_some() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled("Responses", theme.title_style)));
            current_message = Some(entry.message_index);
        }
        let (marker, style) = if active == Some(entry.id.as_str()) {
            ("▸ ", theme.outline_active_style)
        } else {
            ("  ", theme.outline_style)
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{}", entry.label),
            style,
        )));
    }
    lines
}

fn status_line(state: &ChatState) -> Line<'static> {
    let theme = &state.theme;
    if let Some(status) = &state.status {
        return Line::from(Span::styled(status.clone(), theme.error_style));
    }
    let mut text = String::new();
    if state.is_streaming() {
        text.push_str("● consulting the council • ");
    }
    text.push_str(
        "Enter send • Tab/Shift+Tab sections • [ ] responses • Home/End • Ctrl+T theme • Ctrl+B rubber band • Ctrl+R retry • Esc quit",
    );
    Line::from(Span::styled(text, theme.status_style))
}

pub fn ui(f: &mut Frame, state: &ChatState) {
    let theme = &state.theme;
    let areas = areas_for(state, f.area());

    f.render_widget(
        Block::default().style(Style::default().bg(theme.background_color)),
        f.area(),
    );

    let title = state.title.as_deref().unwrap_or("New Conversation");
    let position = if state.viewport.max_scroll() > 0.0 {
        let percent = (state.viewport.scroll_top() / state.viewport.max_scroll() * 100.0).round();
        format!(" {percent:.0}%")
    } else {
        String::new()
    };
    let lines = visible_lines(
        state.layout(),
        &state.viewport,
        usize::from(areas.transcript_rows()),
    );
    let transcript = Paragraph::new(lines).block(
        Block::default().title(Span::styled(
            format!("LLM Council - {title}{position}"),
            theme.title_style,
        )),
    );
    f.render_widget(transcript, areas.transcript);

    if let Some(outline_area) = areas.outline {
        let outline = Paragraph::new(outline_lines(state)).block(
            Block::default()
                .borders(Borders::LEFT)
                .border_style(theme.outline_style),
        );
        f.render_widget(outline, outline_area);
    }

    f.render_widget(Paragraph::new(status_line(state)), areas.status);
    f.render_widget(&state.input, areas.input);
}
