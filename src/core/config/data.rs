use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::api::client::DEFAULT_BASE_URL;
use crate::scroll::animator::SpringConfig;
use crate::scroll::spy::DEFAULT_LOOKAHEAD;

/// Environment variable that overrides the configured backend URL.
pub const BASE_URL_ENV: &str = "COUNCIL_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeName::Dark => ThemeName::Light,
            ThemeName::Light => ThemeName::Dark,
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(ThemeName::Dark),
            "light" => Some(ThemeName::Light),
            _ => None,
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spring constants and scroll-spy reading line for the transcript view.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScrollSettings {
    pub tension: f64,
    pub friction: f64,
    pub mass: f64,
    /// Distance below the top edge, in rows, that decides the active section
    pub lookahead: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        let spring = SpringConfig::default();
        Self {
            tension: spring.tension,
            friction: spring.friction,
            mass: spring.mass,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

impl ScrollSettings {
    pub fn spring(&self) -> SpringConfig {
        SpringConfig {
            tension: self.tension,
            friction: self.friction,
            mass: self.mass,
        }
        .sanitized()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Council backend, e.g. "http://localhost:8001"
    pub base_url: Option<String>,
    /// UI theme ("dark" or "light")
    pub theme: Option<ThemeName>,
    /// Let animated scrolling overshoot the edges
    pub rubberband: Option<bool>,
    /// Stream stage results as they arrive instead of waiting for the whole turn
    pub streaming: Option<bool>,
    #[serde(default)]
    pub scroll: ScrollSettings,
}

impl Config {
    pub fn theme(&self) -> ThemeName {
        self.theme.unwrap_or_default()
    }

    pub fn rubberband_enabled(&self) -> bool {
        self.rubberband.unwrap_or(true)
    }

    pub fn streaming_enabled(&self) -> bool {
        self.streaming.unwrap_or(true)
    }

    /// Base URL after applying the environment and command-line overrides.
    pub fn effective_base_url(&self, cli_override: Option<&str>) -> String {
        let env = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url(cli_override, env.as_deref(), self.base_url.as_deref())
    }
}

/// Pick the backend URL: command line, then environment, then config file,
/// then the default. Blank values are skipped.
pub fn resolve_base_url(
    cli_override: Option<&str>,
    env_value: Option<&str>,
    configured: Option<&str>,
) -> String {
    [cli_override, env_value, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string()
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
