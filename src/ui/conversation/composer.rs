use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// What a key press asks of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerAction {
    None,
    /// The primary submit key was pressed while the composer is enabled
    Submit,
}

/// Text input and the state it shares with the send button
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    content: String,
    /// Cursor position in characters
    cursor: usize,
    placeholder: String,
    enabled: bool,
    has_focus: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            enabled: true,
            has_focus: false,
        }
    }

    /// Handle key input. A disabled composer ignores every key.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerAction {
        if key.kind != KeyEventKind::Press || !self.enabled {
            return ComposerAction::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers == KeyModifiers::SHIFT {
                    self.insert_char('\n');
                } else if key.modifiers.is_empty() {
                    return ComposerAction::Submit;
                }
            }
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.insert_char(c);
                }
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_offset(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.char_count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_count(),
            _ => {}
        }

        ComposerAction::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        for c in text.chars().filter(|c| *c != '\r') {
            self.insert_char(c);
        }
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(chars)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable input and the send button. Disabling drops focus.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.has_focus = false;
        }
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Focus only sticks on an enabled composer
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus && self.enabled;
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if !self.enabled {
            Style::default().fg(Color::DarkGray)
        } else if self.has_focus {
            Style::default().fg(Color::Magenta)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Mensagem")
            .border_style(border);

        let inner = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner.x, inner.y, &placeholder, inner.width);
            return;
        }

        let mut content = self.content.clone();
        if self.has_focus {
            content.insert(self.byte_offset(self.cursor), '▌');
        }

        let lines: Vec<Line> = content.split('\n').map(Line::raw).collect();
        let start = lines.len().saturating_sub(inner.height as usize);
        let style = if self.enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Paragraph::new(lines[start..].to_vec())
            .style(style)
            .render(inner, buf);
    }
}

/// The explicit submit control next to the input
#[derive(Debug, Clone, Copy)]
pub struct SendButton {
    pub enabled: bool,
}

impl Widget for SendButton {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = if self.enabled {
            Style::default()
                .fg(Color::White)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default().borders(Borders::ALL).border_style(style);
        let inner = block.inner(area);
        block.render(area, buf);
        Paragraph::new("Enviar")
            .alignment(Alignment::Center)
            .style(style)
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_requests_submit_without_clearing() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "oi");
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerAction::Submit);
        assert_eq!(composer.content(), "oi");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "a");
        let action = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(action, ComposerAction::None);
        type_text(&mut composer, "b");
        assert_eq!(composer.content(), "a\nb");
    }

    #[test]
    fn modified_enter_does_not_submit() {
        let mut composer = ConversationComposer::new("");
        let action = composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL));
        assert_eq!(action, ComposerAction::None);
    }

    #[test]
    fn disabled_composer_ignores_keys() {
        let mut composer = ConversationComposer::new("");
        composer.set_enabled(false);
        assert_eq!(composer.handle_key(press(KeyCode::Enter)), ComposerAction::None);
        type_text(&mut composer, "x");
        composer.insert_str("colado");
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "olá");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "oá");
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));
        assert_eq!(composer.content(), "á");
        composer.handle_key(press(KeyCode::End));
        type_text(&mut composer, "ç");
        assert_eq!(composer.content(), "áç");
        assert_eq!(composer.cursor(), 2);
    }

    #[test]
    fn focus_requires_enabled_composer() {
        let mut composer = ConversationComposer::new("");
        composer.set_focus(true);
        assert!(composer.has_focus());
        composer.set_enabled(false);
        assert!(!composer.has_focus());
        composer.set_focus(true);
        assert!(!composer.has_focus());
    }
}
