//! Interactive council session.
//!
//! A single task owns [`state::ChatState`]. Terminal input arrives over one
//! channel, stage snapshots from the [`StreamService`] over another, and the
//! scroll animation advances once per loop iteration.

pub mod lifecycle;
pub mod state;

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::CouncilClient;
use crate::core::config::Config;
use crate::core::session::{EventTransport, SessionUpdate, StreamParams, StreamService};
use crate::scroll::{FrameTimer, SystemClock};
use crate::ui::renderer::{areas_for, ui};
use lifecycle::{restore_terminal, set_window_title, setup_terminal, ChatTerminal};
use state::{ChatState, KeyAction};

pub enum UiEvent {
    Crossterm(Event),
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

/// Load (or create) the conversation and hand the terminal to the chat UI.
pub async fn run_chat(
    client: CouncilClient,
    config: Config,
    conversation_id: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let state = match conversation_id {
        Some(id) => {
            let conversation = client.get_conversation(&id).await?;
            let id = conversation.id.clone();
            let title = Some(conversation.title.clone()).filter(|t| !t.trim().is_empty());
            ChatState::new(id, title, conversation.into_messages(), &config)
        }
        None => {
            let conversation = client.create_conversation().await?;
            ChatState::new(conversation.id, None, Vec::new(), &config)
        }
    };
    debug!(conversation_id = %state.conversation_id, "Starting chat");

    let transport: Arc<dyn EventTransport> = Arc::new(client);
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, state, transport).await;
    restore_terminal(&mut terminal)?;
    result
}

fn persist_setting(state: &mut ChatState, mutator: impl FnOnce(&mut Config)) {
    if let Err(err) = Config::mutate(mutator) {
        warn!(error = %err, "Failed to save setting");
        state.status = Some(format!("Failed to save setting: {err}"));
    }
}

/// Returns `true` when the user asked to quit.
fn handle_event(
    state: &mut ChatState,
    ev: Event,
    stream_service: &StreamService,
    transport: &Arc<dyn EventTransport>,
) -> bool {
    match ev {
        Event::Key(key) => match state.handle_key(key) {
            KeyAction::Quit => return true,
            KeyAction::Send(prompt) => {
                let (stream_id, cancel_token) = state.begin_turn(prompt.clone());
                stream_service.spawn_stream(StreamParams {
                    transport: transport.clone(),
                    conversation_id: state.conversation_id.clone(),
                    content: prompt,
                    streaming: state.streaming,
                    cancel_token,
                    stream_id,
                });
            }
            KeyAction::PersistTheme(theme) => {
                persist_setting(state, move |config| config.theme = Some(theme));
            }
            KeyAction::PersistRubberband(enabled) => {
                persist_setting(state, move |config| config.rubberband = Some(enabled));
            }
            KeyAction::Handled | KeyAction::Ignored => {}
        },
        Event::Paste(text) => {
            state.input.insert_str(text);
        }
        _ => {}
    }
    false
}

async fn event_loop(
    terminal: &mut ChatTerminal,
    mut state: ChatState,
    transport: Arc<dyn EventTransport>,
) -> Result<(), Box<dyn Error>> {
    let (stream_service, mut rx) = StreamService::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    const MAX_FPS: u64 = 60;
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;
    let mut timer = FrameTimer::new(SystemClock);
    let mut window_title = String::new();

    let result = 'main_loop: loop {
        let size = terminal.size()?;
        let areas = areas_for(&state, Rect::new(0, 0, size.width, size.height));
        state.relayout(areas.transcript.width, areas.transcript_rows());

        if request_redraw && last_draw.elapsed() >= frame_duration {
            terminal.draw(|f| ui(f, &state))?;
            last_draw = Instant::now();
            request_redraw = false;
        }

        let wanted_title = state.window_title();
        if wanted_title != window_title {
            set_window_title(terminal, &wanted_title)?;
            window_title = wanted_title;
        }

        let mut events_processed = false;
        while let Ok(UiEvent::Crossterm(ev)) = event_rx.try_recv() {
            events_processed = true;
            if handle_event(&mut state, ev, &stream_service, &transport) {
                break 'main_loop Ok(());
            }
        }

        let mut received_any = false;
        while let Ok((update, stream_id)) = rx.try_recv() {
            if let SessionUpdate::End = update {
                debug!(stream_id, "Stream finished");
            }
            received_any |= state.apply_update(update, stream_id);
        }

        let animated = state.tick(timer.tick());

        if events_processed || received_any || animated {
            request_redraw = true;
        }

        if !events_processed && !received_any && !state.animator.is_animating() {
            tokio::time::sleep(Duration::from_millis(16)).await;
        } else {
            tokio::task::yield_now().await;
        }
    };

    state.cancel_stream();
    event_reader_handle.abort();
    result
}
