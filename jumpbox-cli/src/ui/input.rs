use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks the frontend to do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    None,
    /// Hand this line to the navigator
    Submit(String),
    Quit,
}

/// Line buffer plus highlighted row, independent of the terminal
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pub buffer: String,
    pub selected: usize,
}

impl InputState {
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.selected = 0;
    }

    /// Keep the highlight inside a list that may have shrunk
    pub fn clamp(&mut self, rows: usize) {
        if self.selected >= rows {
            self.selected = rows.saturating_sub(1);
        }
    }

    pub fn handle_menu_key(&mut self, key: KeyEvent, rows: usize) -> KeyAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => KeyAction::Quit,
            KeyCode::Char('d') if ctrl && self.buffer.is_empty() => KeyAction::Quit,
            KeyCode::Char('u') if ctrl => {
                self.buffer.clear();
                KeyAction::None
            }
            KeyCode::Enter => {
                if !self.buffer.is_empty() {
                    KeyAction::Submit(std::mem::take(&mut self.buffer))
                } else {
                    self.pick_highlighted(rows)
                }
            }
            KeyCode::Esc => {
                if self.buffer.is_empty() {
                    KeyAction::Submit("back".into())
                } else {
                    self.buffer.clear();
                    KeyAction::None
                }
            }
            KeyCode::Left if self.buffer.is_empty() => KeyAction::Submit("back".into()),
            KeyCode::Right if self.buffer.is_empty() => self.pick_highlighted(rows),
            KeyCode::Up => {
                if rows > 0 {
                    self.selected = if self.selected == 0 {
                        rows - 1
                    } else {
                        self.selected - 1
                    };
                }
                KeyAction::None
            }
            KeyCode::Down => {
                if rows > 0 {
                    self.selected = (self.selected + 1) % rows;
                }
                KeyAction::None
            }
            KeyCode::Home => {
                self.selected = 0;
                KeyAction::None
            }
            KeyCode::End => {
                self.selected = rows.saturating_sub(1);
                KeyAction::None
            }
            KeyCode::Backspace => {
                self.buffer.pop();
                KeyAction::None
            }
            KeyCode::Char(c) if !ctrl => {
                self.buffer.push(c);
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    /// Line editing for free-text prompts: `Some(Some(line))` submits,
    /// `Some(None)` cancels, `None` keeps editing.
    pub fn handle_prompt_key(&mut self, key: KeyEvent) -> Option<Option<String>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => Some(Some(std::mem::take(&mut self.buffer))),
            KeyCode::Esc => Some(None),
            KeyCode::Char('c') if ctrl => Some(None),
            KeyCode::Backspace => {
                self.buffer.pop();
                None
            }
            KeyCode::Char(c) if !ctrl => {
                self.buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn pick_highlighted(&self, rows: usize) -> KeyAction {
        if rows == 0 {
            KeyAction::None
        } else {
            KeyAction::Submit((self.selected + 1).to_string())
        }
    }
}
