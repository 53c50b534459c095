pub mod data;
pub mod io;
pub mod printing;

pub use data::{path_display, resolve_base_url, Config, ScrollSettings, ThemeName};
pub use io::ConfigError;
