//! Council is a terminal client for LLM council backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the streamed-turn pipeline: the SSE decoder, the pure
//!   stage reducer folding events into a [`core::message::ConversationMessage`],
//!   the stream session driving both, and the on-disk configuration.
//! - [`scroll`] holds the spring-damper scroll animator and the scroll spy
//!   that tracks which section is in view.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`api`] defines the backend's REST payloads and the HTTP client.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions and the one-shot commands otherwise.

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod scroll;
pub mod ui;
pub mod utils;
