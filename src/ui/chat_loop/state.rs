use std::collections::HashMap;
use std::time::Duration;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tui_textarea::TextArea;

use crate::core::config::{Config, ThemeName};
use crate::core::message::{ConversationMessage, Stage};
use crate::core::session::SessionUpdate;
use crate::scroll::animator::{ScrollAnimator, ScrollContainer, StepOutcome};
use crate::scroll::spy::ScrollSpy;
use crate::ui::theme::Theme;
use crate::ui::transcript::{build_layout, TranscriptLayout, ROW_HEIGHT};
use crate::ui::viewport::TranscriptViewport;

/// Gap left above a section when jumping to it.
pub const JUMP_MARGIN: f64 = ROW_HEIGHT;

/// Loop iterations per spinner frame.
const SPINNER_SLOWDOWN: usize = 6;

/// What the event loop has to do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Ignored,
    Handled,
    Quit,
    Send(String),
    PersistTheme(ThemeName),
    PersistRubberband(bool),
}

pub struct ChatState {
    pub conversation_id: String,
    pub title: Option<String>,
    pub messages: Vec<ConversationMessage>,
    pub input: TextArea<'static>,
    pub theme: Theme,
    pub viewport: TranscriptViewport,
    pub animator: ScrollAnimator,
    pub spy: ScrollSpy,
    pub status: Option<String>,
    pub streaming: bool,
    stage1_tabs: HashMap<usize, usize>,
    auto_scroll: bool,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    last_prompt: Option<String>,
    layout: TranscriptLayout,
    layout_width: u16,
    layout_dirty: bool,
    frame: usize,
}

impl ChatState {
    pub fn new(
        conversation_id: String,
        title: Option<String>,
        messages: Vec<ConversationMessage>,
        config: &Config,
    ) -> Self {
        let last_prompt = messages
            .iter()
            .rev()
            .find(|message| message.role().is_user())
            .map(|message| message.content.clone());

        let mut state = Self {
            conversation_id,
            title,
            messages,
            input: TextArea::default(),
            theme: Theme::for_name(config.theme()),
            viewport: TranscriptViewport::new(config.rubberband_enabled()),
            animator: ScrollAnimator::new(config.scroll.spring()),
            spy: ScrollSpy::new(config.scroll.lookahead),
            status: None,
            streaming: config.streaming_enabled(),
            stage1_tabs: HashMap::new(),
            auto_scroll: true,
            current_stream_id: 0,
            cancel_token: None,
            last_prompt,
            layout: TranscriptLayout::default(),
            layout_width: 0,
            layout_dirty: true,
            frame: 0,
        };
        state.style_input();
        state
    }

    fn style_input(&mut self) {
        let theme = &self.theme;
        self.input.set_style(theme.input_text_style);
        self.input.set_cursor_style(theme.input_cursor_style);
        self.input.set_cursor_line_style(theme.input_cursor_line_style);
        self.input.set_placeholder_text("What would you like to discuss?");
        self.input.set_block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.input_border_style)
                .title(Span::styled("Ask the council", theme.input_title_style)),
        );
    }

    fn spinner_frame(&self) -> usize {
        self.frame / SPINNER_SLOWDOWN
    }

    pub fn layout(&self) -> &TranscriptLayout {
        &self.layout
    }

    pub fn is_streaming(&self) -> bool {
        self.cancel_token.is_some()
    }

    pub fn is_auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    /// Text for the terminal title: the first question asked.
    pub fn window_title(&self) -> String {
        match self.messages.iter().find(|m| m.role().is_user()) {
            Some(first) => {
                let line = first.content.lines().next().unwrap_or("").trim();
                let mut title: String = line.chars().take(60).collect();
                if line.chars().count() > 60 {
                    title.push('…');
                }
                format!("{title} - council")
            }
            None => "council".to_string(),
        }
    }

    /// Rebuild the layout when content or width changed, and keep the
    /// viewport and spy in step with it.
    pub fn relayout(&mut self, width: u16, viewport_rows: u16) {
        if self.layout_dirty || width != self.layout_width {
            self.layout = build_layout(
                &self.messages,
                width,
                &self.theme,
                &self.stage1_tabs,
                self.spinner_frame(),
            );
            self.layout_width = width;
            self.layout_dirty = false;
            self.spy.invalidate();
        }
        self.viewport
            .resize(self.layout.row_count(), usize::from(viewport_rows));
        if self.auto_scroll && !self.animator.is_animating() {
            let bottom = self.viewport.max_scroll();
            self.viewport.set_scroll_top(bottom);
        }
    }

    /// Advance animation and spinner by one frame. Returns whether anything
    /// visible changed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let mut changed = false;
        match self.animator.step(&mut self.viewport, dt) {
            StepOutcome::Idle => {}
            StepOutcome::Running | StepOutcome::Finished => {
                self.spy.observe_scroll();
                changed = true;
            }
        }

        let before = self.spy.active().map(str::to_owned);
        let after = self
            .spy
            .on_frame(self.viewport.scroll_top(), 0.0, &self.layout.sections);
        if before.as_deref() != after {
            debug!(section = ?after, "Outline section active");
            changed = true;
        }

        if self.messages.iter().any(|m| m.loading.any()) {
            let spinner = self.spinner_frame();
            self.frame = self.frame.wrapping_add(1);
            if self.spinner_frame() != spinner {
                self.layout_dirty = true;
                changed = true;
            }
        }
        changed
    }

    /// Record a prompt and prepare the placeholder it streams into. Returns
    /// the id and token for the new stream.
    pub fn begin_turn(&mut self, prompt: String) -> (u64, CancellationToken) {
        if let Some(previous) = self.cancel_token.take() {
            previous.cancel();
        }
        self.messages.push(ConversationMessage::user(prompt.clone()));
        self.messages.push(ConversationMessage::assistant());
        self.last_prompt = Some(prompt);
        self.status = None;
        self.auto_scroll = true;
        self.layout_dirty = true;

        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        (self.current_stream_id, token)
    }

    /// Apply an update from the stream service. Updates of superseded streams
    /// are dropped.
    pub fn apply_update(&mut self, update: SessionUpdate, stream_id: u64) -> bool {
        if stream_id != self.current_stream_id {
            debug!(stream_id, current = self.current_stream_id, "Dropping stale update");
            return false;
        }
        match update {
            SessionUpdate::Snapshot(message) => {
                if let Some(last) = self
                    .messages
                    .last_mut()
                    .filter(|m| m.role().is_assistant())
                {
                    *last = message;
                } else {
                    self.messages.push(message);
                }
                self.layout_dirty = true;
            }
            SessionUpdate::Title(title) => {
                self.title = Some(title);
            }
            SessionUpdate::End => {
                self.cancel_token = None;
                if let Some(error) = self.messages.last().and_then(|m| m.error.clone()) {
                    self.status = Some(format!("{error} (Ctrl+R to retry)"));
                }
            }
        }
        true
    }

    /// Stop the running stream, keeping whatever arrived.
    pub fn cancel_stream(&mut self) -> bool {
        match self.cancel_token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn scroll_rows(&mut self, rows: i32) {
        self.animator.cancel_active(&mut self.viewport);
        self.viewport.scroll_by_rows(rows);
        self.auto_scroll = self.viewport.is_at_bottom();
        self.spy.observe_scroll();
    }

    pub fn animate_to(&mut self, offset: f64) {
        let bottom = self.viewport.max_scroll();
        self.animator.animate(&mut self.viewport, offset);
        self.auto_scroll = offset >= bottom;
        self.spy.observe_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.animate_to(0.0);
    }

    pub fn scroll_to_bottom(&mut self) {
        let bottom = self.viewport.max_scroll();
        self.animate_to(bottom);
    }

    fn active_section_index(&self) -> Option<usize> {
        let active = self.spy.active()?;
        self.layout
            .sections
            .iter()
            .position(|section| section.id == active)
    }

    pub fn jump_to_section(&mut self, id: &str) -> bool {
        let Some(top) = self.layout.section(id).map(|s| s.offset_top) else {
            return false;
        };
        self.animate_to(top - JUMP_MARGIN);
        true
    }

    pub fn jump_next_section(&mut self) -> bool {
        let target = match self.active_section_index() {
            Some(index) => self.layout.sections.get(index + 1),
            None => self
                .layout
                .next_section(self.viewport.scroll_top() + JUMP_MARGIN),
        };
        match target.map(|s| s.id.clone()) {
            Some(id) => self.jump_to_section(&id),
            None => false,
        }
    }

    pub fn jump_previous_section(&mut self) -> bool {
        let target = match self.active_section_index() {
            Some(index) => index
                .checked_sub(1)
                .and_then(|i| self.layout.sections.get(i)),
            None => self
                .layout
                .previous_section(self.viewport.scroll_top() + JUMP_MARGIN),
        };
        match target.map(|s| s.id.clone()) {
            Some(id) => self.jump_to_section(&id),
            None => false,
        }
    }

    /// Assistant message whose stage 1 tabs the bracket keys cycle: the one
    /// being read, else the newest one with responses.
    fn tab_target(&self) -> Option<usize> {
        let from_active = self.spy.active().and_then(|id| {
            self.layout
                .outline
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| entry.message_index)
        });
        from_active.or_else(|| {
            self.messages
                .iter()
                .rposition(|m| m.stage1.as_ref().is_some_and(|r| !r.is_empty()))
        })
    }

    pub fn cycle_stage1_tab(&mut self, forward: bool) -> bool {
        let Some(index) = self.tab_target() else {
            return false;
        };
        let count = self.messages[index].stage1.as_ref().map_or(0, Vec::len);
        if count == 0 {
            return false;
        }
        let current = self.stage1_tabs.get(&index).copied().unwrap_or(0) % count;
        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        self.stage1_tabs.insert(index, next);
        self.layout_dirty = true;
        true
    }

    pub fn selected_stage1_tab(&self, index: usize) -> usize {
        self.stage1_tabs.get(&index).copied().unwrap_or(0)
    }

    pub fn toggle_theme(&mut self) -> ThemeName {
        let next = self.theme.name.toggled();
        self.theme = Theme::for_name(next);
        self.style_input();
        self.layout_dirty = true;
        next
    }

    pub fn toggle_rubberband(&mut self) -> bool {
        let enabled = !self.viewport.rubberband();
        self.viewport.set_rubberband(enabled);
        enabled
    }

    pub fn input_is_empty(&self) -> bool {
        self.input.lines().iter().all(|line| line.is_empty())
    }

    fn take_input(&mut self) -> Option<String> {
        let text = self.input.lines().join("\n");
        if text.trim().is_empty() {
            return None;
        }
        self.input = TextArea::default();
        self.style_input();
        Some(text.trim().to_string())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::Ignored;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => KeyAction::Quit,
            KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('r') if ctrl => match self.last_prompt.clone() {
                Some(prompt) if !self.is_streaming() => KeyAction::Send(prompt),
                _ => KeyAction::Ignored,
            },
            KeyCode::Char('t') if ctrl => KeyAction::PersistTheme(self.toggle_theme()),
            KeyCode::Char('b') if ctrl => KeyAction::PersistRubberband(self.toggle_rubberband()),
            KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => {
                if self.is_streaming() {
                    self.status = Some("Wait for the council to finish".to_string());
                    return KeyAction::Handled;
                }
                match self.take_input() {
                    Some(prompt) => KeyAction::Send(prompt),
                    None => KeyAction::Ignored,
                }
            }
            KeyCode::Up => {
                self.scroll_rows(-1);
                KeyAction::Handled
            }
            KeyCode::Down => {
                self.scroll_rows(1);
                KeyAction::Handled
            }
            KeyCode::PageUp => {
                self.scroll_rows(-self.viewport.page());
                KeyAction::Handled
            }
            KeyCode::PageDown => {
                self.scroll_rows(self.viewport.page());
                KeyAction::Handled
            }
            KeyCode::Home => {
                self.scroll_to_top();
                KeyAction::Handled
            }
            KeyCode::End => {
                self.scroll_to_bottom();
                KeyAction::Handled
            }
            KeyCode::Tab => {
                self.jump_next_section();
                KeyAction::Handled
            }
            KeyCode::BackTab => {
                self.jump_previous_section();
                KeyAction::Handled
            }
            KeyCode::Char('[') if self.input_is_empty() => {
                self.cycle_stage1_tab(false);
                KeyAction::Handled
            }
            KeyCode::Char(']') if self.input_is_empty() => {
                self.cycle_stage1_tab(true);
                KeyAction::Handled
            }
            _ => {
                self.input.input(tui_textarea::Input::from(key));
                KeyAction::Handled
            }
        }
    }

    pub fn is_loading(&self, stage: Stage) -> bool {
        self.messages
            .last()
            .is_some_and(|message| message.is_loading(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{Stage1Response, Stage3Result};

    const WIDTH: u16 = 60;
    const ROWS: u16 = 10;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn answered(prompt: &str, models: &[&str]) -> Vec<ConversationMessage> {
        let mut assistant = ConversationMessage::assistant();
        assistant.stage1 = Some(
            models
                .iter()
                .map(|model| Stage1Response {
                    model: (*model).to_string(),
                    response: "lorem ipsum dolor sit amet ".repeat(12),
                })
                .collect(),
        );
        assistant.stage3 = Some(Stage3Result {
            model: "chair/man".into(),
            response: "consectetur adipiscing elit ".repeat(12),
        });
        vec![ConversationMessage::user(prompt), assistant]
    }

    fn state_with(messages: Vec<ConversationMessage>) -> ChatState {
        let mut state = ChatState::new("c1".into(), None, messages, &Config::default());
        state.relayout(WIDTH, ROWS);
        state
    }

    fn settle(state: &mut ChatState) {
        for _ in 0..2_000 {
            state.tick(Duration::from_millis(16));
            if !state.animator.is_animating() {
                break;
            }
        }
        state.tick(Duration::from_millis(16));
    }

    #[test]
    fn enter_sends_trimmed_input_and_clears_it() {
        let mut state = state_with(Vec::new());
        for c in "  hello council ".chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(
            state.handle_key(key(KeyCode::Enter)),
            KeyAction::Send("hello council".into())
        );
        assert!(state.input_is_empty());
        assert_eq!(state.handle_key(key(KeyCode::Enter)), KeyAction::Ignored);
    }

    #[test]
    fn quit_keys() {
        let mut state = state_with(Vec::new());
        assert_eq!(state.handle_key(ctrl('c')), KeyAction::Quit);
        assert_eq!(state.handle_key(key(KeyCode::Esc)), KeyAction::Quit);
    }

    #[test]
    fn retry_resends_last_prompt_when_idle() {
        let mut state = state_with(answered("first", &["a/one"]));
        assert_eq!(state.handle_key(ctrl('r')), KeyAction::Send("first".into()));

        state.begin_turn("second".into());
        assert_eq!(state.handle_key(ctrl('r')), KeyAction::Ignored);
    }

    #[test]
    fn updates_from_stale_streams_are_dropped() {
        let mut state = state_with(Vec::new());
        let (first, first_token) = state.begin_turn("one".into());
        let (second, second_token) = state.begin_turn("two".into());
        assert_ne!(first, second);
        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());

        let mut snapshot = ConversationMessage::assistant();
        snapshot.set_loading(Stage::One, true);
        assert!(!state.apply_update(SessionUpdate::Snapshot(snapshot.clone()), first));
        assert!(state.apply_update(SessionUpdate::Snapshot(snapshot), second));
        assert!(state.is_loading(Stage::One));
        assert_eq!(state.messages.len(), 4);
    }

    #[test]
    fn end_of_failed_stream_sets_status() {
        let mut state = state_with(Vec::new());
        let (id, _) = state.begin_turn("one".into());
        let mut failed = ConversationMessage::assistant();
        failed.error = Some("boom".into());
        state.apply_update(SessionUpdate::Snapshot(failed), id);
        state.apply_update(SessionUpdate::Title("Greeting".into()), id);
        state.apply_update(SessionUpdate::End, id);

        assert!(!state.is_streaming());
        assert_eq!(state.title.as_deref(), Some("Greeting"));
        assert_eq!(state.status.as_deref(), Some("boom (Ctrl+R to retry)"));
    }

    #[test]
    fn follows_new_content_until_user_scrolls_away() {
        let mut state = state_with(answered("q", &["a/one"]));
        assert!(state.is_auto_scroll());
        assert_eq!(state.viewport.scroll_top(), state.viewport.max_scroll());

        let (id, _) = state.begin_turn("more".into());
        state.relayout(WIDTH, ROWS);
        assert_eq!(state.viewport.scroll_top(), state.viewport.max_scroll());

        state.handle_key(key(KeyCode::PageUp));
        assert!(!state.is_auto_scroll());
        let held = state.viewport.scroll_top();

        let mut grown = answered("more", &["a/one"]).remove(1);
        grown.set_loading(Stage::Two, true);
        state.apply_update(SessionUpdate::Snapshot(grown), id);
        state.relayout(WIDTH, ROWS);
        assert_eq!(state.viewport.scroll_top(), held);
        assert!(state.viewport.scroll_top() < state.viewport.max_scroll());
    }

    #[test]
    fn manual_scroll_cancels_animation() {
        let mut state = state_with(answered("q", &["a/one"]));
        state.handle_key(key(KeyCode::Home));
        assert!(state.animator.is_animating());
        state.handle_key(key(KeyCode::Down));
        assert!(!state.animator.is_animating());
    }

    #[test]
    fn home_and_end_animate_to_the_edges() {
        let mut state = state_with(answered("q", &["a/one"]));
        state.handle_key(key(KeyCode::Home));
        settle(&mut state);
        assert_eq!(state.viewport.scroll_top(), 0.0);

        state.handle_key(key(KeyCode::End));
        settle(&mut state);
        assert_eq!(state.viewport.scroll_top(), state.viewport.max_scroll());
        assert!(state.is_auto_scroll());
    }

    #[test]
    fn tab_walks_sections_and_spy_follows() {
        let mut state = state_with(answered("q", &["a/one"]));
        state.handle_key(key(KeyCode::Home));
        settle(&mut state);

        state.handle_key(key(KeyCode::Tab));
        settle(&mut state);
        let stage3 = state.layout().section("stage3-1").cloned().expect("stage 3");
        let expected = (stage3.offset_top - JUMP_MARGIN).min(state.viewport.max_scroll());
        assert_eq!(state.viewport.scroll_top(), expected);
        assert_eq!(state.spy.active(), Some("stage3-1"));

        state.handle_key(key(KeyCode::BackTab));
        settle(&mut state);
        assert_eq!(state.spy.active(), Some("stage1-1"));
    }

    #[test]
    fn brackets_cycle_stage_one_tabs() {
        let mut state = state_with(answered("q", &["a/one", "b/two", "c/three"]));
        state.handle_key(key(KeyCode::Char(']')));
        assert_eq!(state.selected_stage1_tab(1), 1);
        state.handle_key(key(KeyCode::Char('[')));
        state.handle_key(key(KeyCode::Char('[')));
        assert_eq!(state.selected_stage1_tab(1), 2);

        // With text in the input, brackets are typed.
        state.handle_key(key(KeyCode::Char('x')));
        state.handle_key(key(KeyCode::Char(']')));
        assert_eq!(state.input.lines(), ["x]"]);
        assert_eq!(state.selected_stage1_tab(1), 2);
    }

    #[test]
    fn toggles_report_values_to_persist() {
        let mut state = state_with(Vec::new());
        assert_eq!(
            state.handle_key(ctrl('t')),
            KeyAction::PersistTheme(ThemeName::Light)
        );
        assert_eq!(state.theme.name, ThemeName::Light);
        assert_eq!(
            state.handle_key(ctrl('b')),
            KeyAction::PersistRubberband(false)
        );
        assert!(!state.viewport.rubberband());
    }

    #[test]
    fn spinner_relayouts_only_when_its_frame_advances() {
        let mut loading = ConversationMessage::assistant();
        loading.loading.stage1 = true;
        let mut state = state_with(vec![ConversationMessage::user("Why?"), loading]);
        assert!(!state.layout_dirty);

        for _ in 0..SPINNER_SLOWDOWN - 1 {
            state.tick(Duration::from_millis(16));
            assert!(!state.layout_dirty);
        }
        assert!(state.tick(Duration::from_millis(16)));
        assert!(state.layout_dirty);

        state.relayout(WIDTH, ROWS);
        state.tick(Duration::from_millis(16));
        assert!(!state.layout_dirty);
    }

    #[test]
    fn window_title_uses_first_question() {
        let state = state_with(answered("Why is the sky blue?\nsecond line", &["a/one"]));
        assert_eq!(state.window_title(), "Why is the sky blue? - council");
        assert_eq!(state_with(Vec::new()).window_title(), "council");
    }
}
