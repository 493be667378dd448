// Raw-mode terminal ownership for the app's lifetime

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::sync::Once;
use tracing::warn;

static PANIC_HOOK: Once = Once::new();

/// Put the terminal back into cooked mode on the main screen.
fn leave_screen() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
}

/// A panic would otherwise print its message into the alternate screen and
/// leave the shell in raw mode.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = leave_screen();
            previous(info);
        }));
    });
}

/// The drawing surface. `active` is true while raw mode and the alternate
/// screen belong to us.
pub struct Tui<B: Backend = CrosstermBackend<Stdout>> {
    terminal: Terminal<B>,
    active: bool,
}

impl Tui {
    pub fn enter() -> Result<Self> {
        install_panic_hook();

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }

        let mut tui = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))?,
            active: true,
        };
        tui.terminal.clear()?;
        Ok(tui)
    }
}

impl<B: Backend> Tui<B> {
    /// Wrap a backend without touching the real terminal.
    pub fn headless(backend: B) -> Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            active: false,
        })
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Hand the terminal back. Safe to call more than once.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        leave_screen()?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<B: Backend> Drop for Tui<B> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("Could not restore the terminal: {}", e);
        }
    }
}
