//! `council set` / `council unset`.

use std::fmt;

use crate::core::config::{Config, ScrollSettings, ThemeName};

/// Keys in display order.
pub const SETTING_KEYS: [&str; 8] = [
    "base-url",
    "theme",
    "rubberband",
    "streaming",
    "scroll-tension",
    "scroll-friction",
    "scroll-mass",
    "scroll-lookahead",
];

/// Errors that can occur when modifying configuration settings.
#[derive(Debug)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    UnknownKey(String),
    /// The provided theme identifier was not found.
    UnknownTheme { input: String },
    /// The provided value could not be parsed as a boolean.
    InvalidBoolean(String),
    /// The provided value is not a usable number for this key.
    InvalidNumber { key: &'static str, input: String },
    /// Required arguments are missing.
    MissingArgs { key: &'static str, example: String },
    /// An error occurred while persisting the configuration.
    ConfigError(String),
}

impl SettingError {
    /// Print the error message to stderr with appropriate formatting.
    pub fn print(&self) {
        match self {
            SettingError::UnknownKey(key) => {
                eprintln!("❌ Unknown config key: {key}");
                eprintln!("   Available keys: {}", SETTING_KEYS.join(", "));
            }
            SettingError::UnknownTheme { input } => {
                eprintln!("❌ Unknown theme: {input}. Use 'dark' or 'light'.");
            }
            SettingError::InvalidBoolean(input) => {
                eprintln!("❌ Invalid boolean value: {input}");
                eprintln!("   Use 'on' or 'off' (also accepts true/false, yes/no)");
            }
            SettingError::InvalidNumber { key, input } => {
                eprintln!("❌ Invalid value for {key}: {input}");
            }
            SettingError::MissingArgs { key, example } => {
                eprintln!("⚠️  Specify a value for {key}:");
                eprintln!("Example: {example}");
            }
            SettingError::ConfigError(msg) => {
                eprintln!("❌ Failed to save configuration: {msg}");
            }
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::UnknownTheme { input } => write!(f, "Unknown theme: {input}"),
            SettingError::InvalidBoolean(input) => write!(f, "Invalid boolean value: {input}"),
            SettingError::InvalidNumber { key, input } => {
                write!(f, "Invalid value for {key}: {input}")
            }
            SettingError::MissingArgs { key, .. } => write!(f, "Missing value for {key}"),
            SettingError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for SettingError {}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(String),
    Theme(ThemeName),
    Bool(bool),
    Number(f64),
}

fn canonical_key(key: &str) -> Result<&'static str, SettingError> {
    let normalized = key.trim().to_ascii_lowercase().replace(['_', '.'], "-");
    SETTING_KEYS
        .iter()
        .copied()
        .find(|candidate| *candidate == normalized)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))
}

fn example_for(key: &'static str) -> String {
    let value = match key {
        "base-url" => "http://localhost:8001",
        "theme" => "light",
        "rubberband" | "streaming" => "off",
        "scroll-lookahead" => "100",
        _ => "150",
    };
    format!("council set {key} {value}")
}

/// Validate `input` for `key`.
pub fn parse_setting(key: &str, input: &str) -> Result<(&'static str, SettingValue), SettingError> {
    let key = canonical_key(key)?;
    let input = input.trim();
    if input.is_empty() {
        return Err(SettingError::MissingArgs {
            key,
            example: example_for(key),
        });
    }

    let value = match key {
        "base-url" => SettingValue::Text(input.trim_end_matches('/').to_string()),
        "theme" => SettingValue::Theme(ThemeName::parse(input).ok_or_else(|| {
            SettingError::UnknownTheme {
                input: input.to_string(),
            }
        })?),
        "rubberband" | "streaming" => SettingValue::Bool(
            parse_bool(input).ok_or_else(|| SettingError::InvalidBoolean(input.to_string()))?,
        ),
        _ => {
            let number = input
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .filter(|n| match key {
                    "scroll-tension" | "scroll-mass" => *n > 0.0,
                    _ => *n >= 0.0,
                })
                .ok_or_else(|| SettingError::InvalidNumber {
                    key,
                    input: input.to_string(),
                })?;
            SettingValue::Number(number)
        }
    };
    Ok((key, value))
}

/// Set `key` to `value`, or back to its default when `value` is `None`.
/// `key` must be one of [`SETTING_KEYS`].
pub fn apply_setting(config: &mut Config, key: &str, value: Option<SettingValue>) {
    let defaults = ScrollSettings::default();
    match (key, value) {
        ("base-url", Some(SettingValue::Text(url))) => config.base_url = Some(url),
        ("base-url", _) => config.base_url = None,
        ("theme", Some(SettingValue::Theme(theme))) => config.theme = Some(theme),
        ("theme", _) => config.theme = None,
        ("rubberband", Some(SettingValue::Bool(on))) => config.rubberband = Some(on),
        ("rubberband", _) => config.rubberband = None,
        ("streaming", Some(SettingValue::Bool(on))) => config.streaming = Some(on),
        ("streaming", _) => config.streaming = None,
        ("scroll-tension", Some(SettingValue::Number(n))) => config.scroll.tension = n,
        ("scroll-tension", _) => config.scroll.tension = defaults.tension,
        ("scroll-friction", Some(SettingValue::Number(n))) => config.scroll.friction = n,
        ("scroll-friction", _) => config.scroll.friction = defaults.friction,
        ("scroll-mass", Some(SettingValue::Number(n))) => config.scroll.mass = n,
        ("scroll-mass", _) => config.scroll.mass = defaults.mass,
        ("scroll-lookahead", Some(SettingValue::Number(n))) => config.scroll.lookahead = n,
        ("scroll-lookahead", _) => config.scroll.lookahead = defaults.lookahead,
        _ => {}
    }
}

fn display_value(value: &SettingValue) -> String {
    match value {
        SettingValue::Text(text) => text.clone(),
        SettingValue::Theme(theme) => theme.to_string(),
        SettingValue::Bool(true) => "on".to_string(),
        SettingValue::Bool(false) => "off".to_string(),
        SettingValue::Number(n) => n.to_string(),
    }
}

/// `council set [key [value...]]`
pub fn run_set(key: Option<String>, value: Vec<String>) -> Result<(), SettingError> {
    let Some(key) = key else {
        let config = Config::load().map_err(|e| SettingError::ConfigError(e.to_string()))?;
        config.print_all();
        return Ok(());
    };

    let (key, value) = parse_setting(&key, &value.join(" "))?;
    let shown = display_value(&value);
    Config::mutate(move |config| apply_setting(config, key, Some(value)))
        .map_err(|e| SettingError::ConfigError(e.to_string()))?;
    println!("✅ Set {key} to: {shown}");
    Ok(())
}

/// `council unset <key>`
pub fn run_unset(key: &str) -> Result<(), SettingError> {
    let key = canonical_key(key)?;
    Config::mutate(|config| apply_setting(config, key, None))
        .map_err(|e| SettingError::ConfigError(e.to_string()))?;
    println!("✅ Unset {key}");
    Ok(())
}
