use crate::events::AppEvent;
use crate::session::{ChatSession, SubmitOutcome};
use crate::ui::conversation::composer::{ComposerAction, SendButton};
use crate::ui::conversation::{SlashCommand, get_help_text, parse_slash_command};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tracing::debug;

const SCROLL_STEP: usize = 5;
const BUTTON_WIDTH: u16 = 12;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Routes terminal input and background events into the session and draws it
pub struct ConversationManager {
    session: ChatSession,
    send_button: Rect,
}

impl ConversationManager {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            send_button: Rect::default(),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn handle_terminal_event(&mut self, event: Event) -> ConversationAction {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Paste(text) => {
                self.session.composer_mut().insert_str(&text);
                ConversationAction::None
            }
            _ => ConversationAction::None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return ConversationAction::Exit,
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return ConversationAction::Exit,
            KeyCode::PageUp => {
                self.session.history_mut().scroll_up(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.session.history_mut().scroll_down(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.session.composer_mut().handle_key(key) {
            ComposerAction::Submit => self.submit_input(),
            ComposerAction::None => ConversationAction::None,
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> ConversationAction {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if contains(self.send_button, mouse.column, mouse.row) {
                    return self.click_send();
                }
                ConversationAction::None
            }
            MouseEventKind::ScrollUp => {
                self.session.history_mut().scroll_up(1);
                ConversationAction::None
            }
            MouseEventKind::ScrollDown => {
                self.session.history_mut().scroll_down(1);
                ConversationAction::None
            }
            _ => ConversationAction::None,
        }
    }

    /// The send button; inert while disabled
    pub fn click_send(&mut self) -> ConversationAction {
        if !self.session.composer().is_enabled() {
            return ConversationAction::None;
        }
        self.submit_input()
    }

    /// Shared by the send button and the submit key
    fn submit_input(&mut self) -> ConversationAction {
        let content = self.session.composer().content().to_string();

        if let Some(command) = parse_slash_command(&content) {
            self.session.composer_mut().clear();
            return self.handle_slash_command(command);
        }

        if self.session.submit(&content) == SubmitOutcome::Ignored {
            debug!("ignored blank submission");
        }
        ConversationAction::None
    }

    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        debug!(command = command.command(), "slash command");
        match command {
            SlashCommand::Help => {
                self.session.notice(&get_help_text());
                ConversationAction::None
            }
            SlashCommand::Clear => {
                self.session.clear_log();
                ConversationAction::None
            }
            SlashCommand::Bye => ConversationAction::Exit,
        }
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Transport(event) => self.session.apply(event),
            AppEvent::IndicatorTick(indicator) => {
                self.session.on_indicator_tick(indicator);
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Hints
            ])
            .split(frame.size());

        let input_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(BUTTON_WIDTH)])
            .split(chunks[1]);
        self.send_button = input_row[1];

        frame.render_widget(self.session.history(), chunks[0]);
        frame.render_widget(self.session.composer(), input_row[0]);
        frame.render_widget(
            SendButton {
                enabled: self.session.composer().is_enabled(),
            },
            input_row[1],
        );
        frame.render_widget(Paragraph::new(self.hint_line()), chunks[2]);
    }

    fn hint_line(&self) -> Line<'static> {
        let dim = Style::default().fg(Color::DarkGray);
        if self.session.is_pending() {
            return Line::from(vec![Span::styled(
                "Aguardando resposta do Astrolino...",
                Style::default().fg(Color::Yellow),
            )]);
        }
        Line::from(vec![Span::styled(
            "Enter envia · Shift+Enter nova linha · /help comandos · Esc sai",
            dim,
        )])
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}
