use crate::core::config::data::Config;

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Config {
    /// Lines shown by `council set` without arguments.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec!["Current configuration:".to_string()];
        match &self.base_url {
            Some(url) => lines.push(format!("  base-url: {url}")),
            None => lines.push("  base-url: (unset)".to_string()),
        }
        match self.theme {
            Some(theme) => lines.push(format!("  theme: {theme}")),
            None => lines.push(format!("  theme: (unset, default: {})", self.theme())),
        }
        lines.push(format!("  rubberband: {}", on_off(self.rubberband_enabled())));
        lines.push(format!("  streaming: {}", on_off(self.streaming_enabled())));
        lines.push(format!("  scroll-tension: {}", self.scroll.tension));
        lines.push(format!("  scroll-friction: {}", self.scroll.friction));
        lines.push(format!("  scroll-mass: {}", self.scroll.mass));
        lines.push(format!("  scroll-lookahead: {}", self.scroll.lookahead));
        lines
    }

    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }
}
