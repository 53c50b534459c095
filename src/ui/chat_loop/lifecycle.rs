use std::{error::Error, io};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    cursor::SetCursorStyle,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use ratatui::Terminal;

pub type ChatTerminal<W = io::Stdout> = Terminal<CrosstermBackend<W>>;

pub fn setup_terminal() -> Result<ChatTerminal, Box<dyn Error>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableBracketedPaste,
        SetCursorStyle::SteadyBar
    )?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).inspect_err(|_| {
        let _ = disable_raw_mode();
    })?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut ChatTerminal) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Strip control characters so backend text cannot smuggle escape sequences
/// into the title.
fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !c.is_control()).collect()
}

pub fn set_window_title(terminal: &mut ChatTerminal, title: &str) -> io::Result<()> {
    execute!(terminal.backend_mut(), SetTitle(sanitize_title(title)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_terminal_round_trips_when_available() {
        // Headless runs cannot switch to raw mode; only exercise the happy path
        // when a terminal is present.
        if let Ok(mut terminal) = setup_terminal() {
            let _ = restore_terminal(&mut terminal);
        }
    }

    #[test]
    fn titles_lose_control_characters() {
        assert_eq!(sanitize_title("sky\x1b]0;pwned\x07 blue"), "sky]0;pwned blue");
        assert_eq!(sanitize_title("Why is the sky blue?"), "Why is the sky blue?");
    }
}
