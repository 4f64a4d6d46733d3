use std::io;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use jumpbox_core::controller::Frontend;
use jumpbox_core::navigator::MenuView;

use super::input::{InputState, KeyAction};
use super::menu::{self, PromptOverlay};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Full-screen menu on the login terminal.
///
/// Raw mode is on whenever the menu is showing, so Ctrl-C arrives as a key
/// and ends the menu instead of killing the process.
pub struct TuiFrontend {
    terminal: Option<Term>,
    /// Raw mode and alternate screen are currently on
    active: bool,
    input: InputState,
    /// Breadcrumb, listing and filter of the last drawn level
    shown: Option<(Vec<String>, Option<String>, Option<String>)>,
    last_view: Option<MenuView>,
}

impl TuiFrontend {
    pub fn new() -> Self {
        Self {
            terminal: None,
            active: false,
            input: InputState::default(),
            shown: None,
            last_view: None,
        }
    }

    fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        self.active = true;
        if let Some(terminal) = self.terminal.as_mut() {
            terminal.clear()?;
        }
        Ok(())
    }

    fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        match self.terminal.as_mut() {
            Some(terminal) => {
                execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
                terminal.show_cursor()?;
            }
            None => execute!(io::stdout(), LeaveAlternateScreen)?,
        }
        Ok(())
    }

    fn terminal(&mut self) -> io::Result<&mut Term> {
        self.terminal
            .as_mut()
            .ok_or_else(|| io::Error::other("terminal not started"))
    }

    fn draw(&mut self, view: &MenuView, prompt: Option<PromptOverlay>) -> io::Result<()> {
        let input = self.input.clone();
        self.terminal()?
            .draw(|f| menu::render(f, view, &input, prompt))?;
        Ok(())
    }
}

impl Default for TuiFrontend {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks for the next key press; other events (resize, focus) yield `None`
/// so the caller redraws.
fn next_key() -> io::Result<Option<event::KeyEvent>> {
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
        _ => Ok(None),
    }
}

impl Frontend for TuiFrontend {
    fn start(&mut self) -> io::Result<()> {
        self.enter()?;
        match Terminal::new(CrosstermBackend::new(io::stdout())) {
            Ok(terminal) => {
                self.terminal = Some(terminal);
                Ok(())
            }
            Err(e) => {
                let _ = self.leave();
                Err(e)
            }
        }
    }

    fn read_line(&mut self, view: &MenuView) -> io::Result<Option<String>> {
        let level = (
            view.breadcrumb.clone(),
            view.listing.clone(),
            view.filter.clone(),
        );
        if self.shown.as_ref() != Some(&level) {
            self.input.reset();
            self.shown = Some(level);
        }
        self.input.clamp(view.entries.len());
        self.last_view = Some(view.clone());

        loop {
            self.draw(view, None)?;
            let Some(key) = next_key()? else {
                continue;
            };
            match self.input.handle_menu_key(key, view.entries.len()) {
                KeyAction::None => {}
                KeyAction::Submit(line) => return Ok(Some(line)),
                KeyAction::Quit => return Ok(None),
            }
        }
    }

    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        let Some(view) = self.last_view.clone() else {
            return Err(io::Error::other("prompt before the menu was drawn"));
        };
        let mut answer = InputState::default();

        loop {
            self.draw(
                &view,
                Some(PromptOverlay {
                    question,
                    answer: &answer.buffer,
                }),
            )?;
            let Some(key) = next_key()? else {
                continue;
            };
            if let Some(result) = answer.handle_prompt_key(key) {
                return Ok(result);
            }
        }
    }

    fn suspend(&mut self) -> io::Result<()> {
        self.leave()
    }

    fn resume(&mut self) -> io::Result<()> {
        self.enter()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.leave()?;
        self.terminal = None;
        Ok(())
    }
}

impl Drop for TuiFrontend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}
