//! Terminal UI for interactive council sessions.
//!
//! - [`chat_loop`]: terminal lifecycle, the event loop, and the chat state it
//!   drives.
//! - [`transcript`]: wraps messages into rows and records where each stage
//!   block sits.
//! - [`viewport`]: the scroll container the spring animator moves.
//! - [`renderer`] and [`theme`]: frame composition and colors.

pub mod chat_loop;
pub mod renderer;
pub mod theme;
pub mod transcript;
pub mod viewport;
