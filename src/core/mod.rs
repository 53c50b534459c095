pub mod config;
pub mod decoder;
pub mod event;
pub mod message;
pub mod reducer;
pub mod session;
