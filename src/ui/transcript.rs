//! Transcript layout.
//!
//! Messages are pre-wrapped to the viewport width so the row of every stage
//! block is known. Those rows become [`SectionAnchor`]s for the scroll spy and
//! the outline panel. Offsets are expressed in layout units of
//! [`ROW_HEIGHT`] per terminal row, which keeps the spring and spy constants
//! on the same scale as a browser's pixels.

use std::collections::HashMap;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::message::{ConversationMessage, Stage, Stage2Result};
use crate::scroll::spy::SectionAnchor;
use crate::ui::theme::Theme;

/// Layout units per terminal row.
pub const ROW_HEIGHT: f64 = 20.0;

const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub id: String,
    pub label: &'static str,
    /// Index of the assistant message the section belongs to.
    pub message_index: usize,
}

#[derive(Debug, Default)]
pub struct TranscriptLayout {
    pub lines: Vec<Line<'static>>,
    pub sections: Vec<SectionAnchor>,
    pub outline: Vec<OutlineEntry>,
}

impl TranscriptLayout {
    pub fn row_count(&self) -> usize {
        self.lines.len()
    }

    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * ROW_HEIGHT
    }

    pub fn section(&self, id: &str) -> Option<&SectionAnchor> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// First section that starts below `offset`.
    pub fn next_section(&self, offset: f64) -> Option<&SectionAnchor> {
        self.sections
            .iter()
            .find(|section| section.offset_top > offset + f64::EPSILON)
    }

    /// Last section that starts above `offset`.
    pub fn previous_section(&self, offset: f64) -> Option<&SectionAnchor> {
        self.sections
            .iter()
            .rev()
            .find(|section| section.offset_top < offset - f64::EPSILON)
    }
}

pub fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::One => "Stage 1: Responses",
        Stage::Two => "Stage 2: Rankings",
        Stage::Three => "Stage 3: Final Answer",
    }
}

fn stage_heading(stage: Stage) -> &'static str {
    match stage {
        Stage::One => "Stage 1: Individual Responses",
        Stage::Two => "Stage 2: Peer Rankings",
        Stage::Three => "Stage 3: Final Council Answer",
    }
}

fn loading_text(stage: Stage) -> &'static str {
    match stage {
        Stage::One => "Running Stage 1: Collecting individual responses...",
        Stage::Two => "Running Stage 2: Peer rankings...",
        Stage::Three => "Running Stage 3: Final synthesis...",
    }
}

/// "openai/gpt-4o" → "gpt-4o".
pub fn short_model_name(model: &str) -> &str {
    model
        .split_once('/')
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
        .unwrap_or(model)
}

/// Greedy word wrap by display width. Newlines are kept as paragraph breaks,
/// spacing between words and leading indentation survive, and words wider
/// than `width` are split. The gap at a wrap point is dropped.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r').replace('\t', "    ");
        let mut current = String::new();
        let mut current_width = 0;
        let mut rest = paragraph.trim_end();

        while let Some(start) = rest.find(|c: char| !c.is_whitespace()) {
            let (gap, tail) = rest.split_at(start);
            let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
            let (word, tail) = tail.split_at(end);
            rest = tail;

            let gap_width = gap.width();
            let word_width = word.width();
            if current_width + gap_width + word_width <= width {
                current.push_str(gap);
                current.push_str(word);
                current_width += gap_width + word_width;
                continue;
            }

            if !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
            }

            if word_width <= width {
                current.push_str(word);
                current_width = word_width;
                continue;
            }

            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if current_width + ch_width > width && !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(ch);
                current_width += ch_width;
            }
        }

        rows.push(current);
    }

    rows
}

struct LayoutBuilder<'a> {
    theme: &'a Theme,
    width: usize,
    spinner: char,
    layout: TranscriptLayout,
}

impl<'a> LayoutBuilder<'a> {
    fn row(&self) -> usize {
        self.layout.lines.len()
    }

    fn blank(&mut self) {
        self.layout.lines.push(Line::from(""));
    }

    fn push_wrapped(&mut self, text: &str, style: Style, indent: usize) {
        let pad = " ".repeat(indent);
        for row in wrap_text(text, self.width.saturating_sub(indent)) {
            self.layout
                .lines
                .push(Line::from(Span::styled(format!("{pad}{row}"), style)));
        }
    }

    fn push_user(&mut self, content: &str) {
        let prefix = "You: ";
        let rows = wrap_text(content, self.width.saturating_sub(prefix.len()));
        for (i, row) in rows.into_iter().enumerate() {
            let lead = if i == 0 {
                Span::styled(prefix, self.theme.user_prefix_style)
            } else {
                Span::raw(" ".repeat(prefix.len()))
            };
            self.layout.lines.push(Line::from(vec![
                lead,
                Span::styled(row, self.theme.user_text_style),
            ]));
        }
        self.blank();
    }

    fn push_loading(&mut self, stage: Stage) {
        self.layout.lines.push(Line::from(Span::styled(
            format!("{} {}", self.spinner, loading_text(stage)),
            self.theme.stage_loading_style,
        )));
        self.blank();
    }

    fn open_section(&mut self, stage: Stage, index: usize) -> (String, usize) {
        let id = stage.section_id(index);
        let start = self.row();
        self.layout.lines.push(Line::from(Span::styled(
            stage_heading(stage),
            self.theme.stage_header_style,
        )));
        self.layout.outline.push(OutlineEntry {
            id: id.clone(),
            label: stage_label(stage),
            message_index: index,
        });
        (id, start)
    }

    fn close_section(&mut self, (id, start): (String, usize)) {
        self.blank();
        let rows = self.row() - start;
        self.layout.sections.push(SectionAnchor::new(
            id,
            start as f64 * ROW_HEIGHT,
            rows as f64 * ROW_HEIGHT,
        ));
    }

    fn push_tabs(&mut self, labels: &[&str], selected: usize) {
        let mut spans = Vec::new();
        let mut used = 0;
        for (i, label) in labels.iter().enumerate() {
            let text = format!(" {label} ");
            let w = text.width() + 1;
            if used + w > self.width && !spans.is_empty() {
                self.layout.lines.push(Line::from(std::mem::take(&mut spans)));
                used = 0;
            }
            let style = if i == selected {
                self.theme.tab_active_style
            } else {
                self.theme.tab_inactive_style
            };
            spans.push(Span::styled(text, style));
            spans.push(Span::raw(" "));
            used += w;
        }
        if !spans.is_empty() {
            self.layout.lines.push(Line::from(spans));
        }
    }

    fn push_assistant(&mut self, message: &ConversationMessage, index: usize, tab: usize) {
        if let Some(responses) = message.stage1.as_ref().filter(|r| !r.is_empty()) {
            let section = self.open_section(Stage::One, index);
            let labels: Vec<&str> = responses
                .iter()
                .map(|r| short_model_name(&r.model))
                .collect();
            let selected = tab.min(responses.len() - 1);
            self.push_tabs(&labels, selected);
            let response = &responses[selected];
            self.push_wrapped(&response.model, self.theme.title_style, 2);
            self.push_wrapped(&response.response, self.theme.assistant_text_style, 2);
            self.close_section(section);
        } else if message.is_loading(Stage::One) {
            self.push_loading(Stage::One);
        }

        if let Some(result) = &message.stage2 {
            let section = self.open_section(Stage::Two, index);
            self.push_rankings(result);
            self.close_section(section);
        } else if message.is_loading(Stage::Two) {
            self.push_loading(Stage::Two);
        }

        if let Some(result) = &message.stage3 {
            let section = self.open_section(Stage::Three, index);
            self.push_wrapped(
                &format!("Chairman: {}", short_model_name(&result.model)),
                self.theme.title_style,
                2,
            );
            self.push_wrapped(&result.response, self.theme.assistant_text_style, 2);
            self.close_section(section);
        } else if message.is_loading(Stage::Three) {
            self.push_loading(Stage::Three);
        }

        if let Some(error) = &message.error {
            self.push_wrapped(&format!("⚠ {error}"), self.theme.error_style, 0);
            self.blank();
        }
    }

    fn push_rankings(&mut self, result: &Stage2Result) {
        if !result.aggregate_rankings.is_empty() {
            self.push_wrapped("Aggregate ranking", self.theme.title_style, 2);
            for (position, entry) in result.aggregate_rankings.iter().enumerate() {
                let line = format!(
                    "{}. {}  avg {:.2} ({} votes)",
                    position + 1,
                    short_model_name(&entry.model),
                    entry.average_rank,
                    entry.rankings_count
                );
                self.push_wrapped(&line, self.theme.ranking_style, 4);
            }
            self.blank();
        }

        for ranking in &result.rankings {
            self.push_wrapped(short_model_name(&ranking.model), self.theme.title_style, 2);
            self.push_wrapped(
                &result.deanonymize(&ranking.ranking),
                self.theme.assistant_text_style,
                4,
            );
            if !ranking.parsed_ranking.is_empty() {
                let parsed = ranking
                    .parsed_ranking
                    .iter()
                    .map(|label| {
                        result
                            .label_to_model
                            .get(label)
                            .map(|model| short_model_name(model).to_string())
                            .unwrap_or_else(|| label.clone())
                    })
                    .collect::<Vec<_>>()
                    .join(" > ");
                self.push_wrapped(&format!("Extracted: {parsed}"), self.theme.ranking_style, 4);
            }
        }
    }
}

/// Lay out the whole conversation at `width` columns.
///
/// `stage1_tabs` maps an assistant message index to its selected stage 1 tab;
/// `frame` drives the loading spinner.
pub fn build_layout(
    messages: &[ConversationMessage],
    width: u16,
    theme: &Theme,
    stage1_tabs: &HashMap<usize, usize>,
    frame: usize,
) -> TranscriptLayout {
    let mut builder = LayoutBuilder {
        theme,
        width: usize::from(width).max(1),
        spinner: SPINNER_FRAMES[frame % SPINNER_FRAMES.len()],
        layout: TranscriptLayout::default(),
    };

    for (index, message) in messages.iter().enumerate() {
        if message.role().is_user() {
            builder.push_user(&message.content);
        } else {
            let tab = stage1_tabs.get(&index).copied().unwrap_or(0);
            builder.push_assistant(message, index, tab);
        }
    }

    builder.layout
}
