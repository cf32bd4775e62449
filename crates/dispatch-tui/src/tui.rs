//! Terminal lifecycle: raw mode, alternate screen, mouse capture, and
//! panic-safe restoration.

use std::io::{Stdout, stdout};

use color_eyre::eyre::Result;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

pub type Backend = CrosstermBackend<Stdout>;

/// Owns the terminal for the lifetime of the board.
pub struct Tui {
    terminal: Terminal<Backend>,
    entered: bool,
}

impl Tui {
    pub fn new() -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self {
            terminal,
            entered: false,
        })
    }

    /// Enter raw mode on the alternate screen. Mouse capture is required:
    /// every drag gesture arrives as mouse events.
    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
        self.terminal.clear()?;
        self.entered = true;
        Ok(())
    }

    /// Leave the alternate screen. Idempotent.
    pub fn exit(&mut self) {
        if std::mem::take(&mut self.entered) {
            restore();
        }
    }

    pub fn draw<F>(&mut self, render: F) -> Result<()>
    where
        F: FnOnce(&mut ratatui::Frame),
    {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Terminal size as (width, height).
    pub fn size(&self) -> Result<(u16, u16)> {
        let size = self.terminal.size()?;
        Ok((size.width, size.height))
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        self.exit();
    }
}

/// Best-effort terminal restoration; partial failures are ignored.
fn restore() {
    let _ = execute!(stdout(), cursor::Show, DisableMouseCapture, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Install error and panic hooks that restore the terminal first.
///
/// Call before entering the terminal so init panics print cleanly. With
/// `RUST_BACKTRACE` set, panics go through `better-panic` for a full,
/// source-annotated trace.
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    let verbose = std::env::var_os("RUST_BACKTRACE").is_some();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        if verbose {
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .create_panic_handler()(info);
        } else {
            panic_hook(info);
        }
    }));

    Ok(())
}
