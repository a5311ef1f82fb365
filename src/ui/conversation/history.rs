//! Conversation history display component

use crate::events::{IndicatorId, Message, Sender};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::cell::Cell;
use std::collections::VecDeque;

/// Frames of the typing indicator, cycled in order
pub const INDICATOR_PHASES: [&str; 3] = [".", "..", "..."];

pub const BOT_NAME: &str = "Astrolino";
const BOT_AVATAR: &str = "🪐";

/// One entry of the visible log
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Message(Message),
    Indicator { id: IndicatorId, phase: usize },
}

/// The scrolling conversation log
#[derive(Debug)]
pub struct ConversationHistory {
    entries: VecDeque<LogEntry>,
    max_messages: usize,
    /// Lines scrolled up from the tail; 0 follows new messages
    scroll_offset: usize,
    max_scroll: Cell<usize>,
}

impl ConversationHistory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_messages: max_messages.max(1),
            scroll_offset: 0,
            max_scroll: Cell::new(0),
        }
    }

    /// Add a message and scroll to show it. The oldest messages are dropped past the cap.
    pub fn push_message(&mut self, message: Message) {
        self.entries.push_back(LogEntry::Message(message));

        while self.message_count() > self.max_messages {
            let oldest = self
                .entries
                .iter()
                .position(|entry| matches!(entry, LogEntry::Message(_)));
            match oldest {
                Some(index) => {
                    self.entries.remove(index);
                }
                None => break,
            }
        }

        self.scroll_to_bottom();
    }

    /// Add the typing placeholder. Refused when one is already present.
    pub fn push_indicator(&mut self, id: IndicatorId) -> bool {
        if self.indicator().is_some() {
            return false;
        }
        self.entries.push_back(LogEntry::Indicator { id, phase: 0 });
        self.scroll_to_bottom();
        true
    }

    pub fn remove_indicator(&mut self, id: IndicatorId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, LogEntry::Indicator { id: current, .. } if *current == id));
        self.entries.len() != before
    }

    /// Move the placeholder to its next frame; false when it is not in the log
    pub fn advance_indicator(&mut self, id: IndicatorId) -> bool {
        for entry in self.entries.iter_mut() {
            if let LogEntry::Indicator { id: current, phase } = entry {
                if *current == id {
                    *phase = (*phase + 1) % INDICATOR_PHASES.len();
                    return true;
                }
            }
        }
        false
    }

    /// The live placeholder and its current phase
    pub fn indicator(&self) -> Option<(IndicatorId, usize)> {
        self.entries.iter().find_map(|entry| match entry {
            LogEntry::Indicator { id, phase } => Some((*id, *phase)),
            LogEntry::Message(_) => None,
        })
    }

    pub fn indicator_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, LogEntry::Indicator { .. }))
            .count()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Message(message) => Some(message),
            LogEntry::Indicator { .. } => None,
        })
    }

    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Drop every message; a live placeholder stays
    pub fn clear_messages(&mut self) {
        self.entries
            .retain(|entry| matches!(entry, LogEntry::Indicator { .. }));
        self.scroll_to_bottom();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(lines)
            .min(self.max_scroll.get());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Lay out every entry for a panel `width` columns wide
    pub fn layout_lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = width as usize;
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                LogEntry::Message(message) => render_message(message, width, &mut lines),
                LogEntry::Indicator { phase, .. } => render_indicator(*phase, &mut lines),
            }
            lines.push(Line::default());
        }
        lines.pop();
        lines
    }
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{BOT_AVATAR} {BOT_NAME}"));

        let inner = block.inner(area);
        block.render(area, buf);

        if self.entries.is_empty() {
            let waiting = Line::from(vec![Span::styled(
                "Nenhuma mensagem por aqui ainda.",
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner.x, inner.y, &waiting, inner.width);
            return;
        }

        let lines = self.layout_lines(inner.width);
        let height = inner.height as usize;
        let max_scroll = lines.len().saturating_sub(height);
        self.max_scroll.set(max_scroll);

        let offset = self.scroll_offset.min(max_scroll);
        let end = lines.len() - offset;
        let start = end.saturating_sub(height);
        let visible: Vec<Line<'static>> = lines[start..end].to_vec();

        Paragraph::new(visible).render(inner, buf);
    }
}

fn render_message(message: &Message, width: usize, lines: &mut Vec<Line<'static>>) {
    let timestamp = message.timestamp.format("%H:%M").to_string();
    match message.sender {
        Sender::User => {
            let bubble_width = (width * 3 / 4).max(1);
            lines.push(
                Line::from(vec![Span::styled(
                    format!("Você · {timestamp}"),
                    Style::default().fg(Color::DarkGray),
                )])
                .alignment(Alignment::Right),
            );
            let style = Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD);
            for line in &message.body.lines {
                for wrapped in wrap_line(line, bubble_width) {
                    lines.push(wrapped.patch_style(style).alignment(Alignment::Right));
                }
            }
        }
        Sender::Bot => {
            lines.push(Line::from(vec![Span::styled(
                format!("{BOT_AVATAR} {BOT_NAME} · {timestamp}"),
                Style::default().fg(Color::Cyan),
            )]));
            let body_width = width.saturating_sub(2).max(1);
            for line in &message.body.lines {
                for wrapped in wrap_line(line, body_width) {
                    let mut spans = vec![Span::raw("  ")];
                    spans.extend(wrapped.spans);
                    lines.push(Line::from(spans));
                }
            }
        }
    }
}

fn render_indicator(phase: usize, lines: &mut Vec<Line<'static>>) {
    let dots = INDICATOR_PHASES[phase % INDICATOR_PHASES.len()];
    lines.push(Line::from(vec![
        Span::styled(
            format!("{BOT_AVATAR} {BOT_NAME} está digitando"),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(dots, Style::default().fg(Color::Yellow)),
    ]));
}

fn text_width(text: &str) -> usize {
    Span::raw(text).width()
}

/// Greedy word wrap that keeps span styles; words wider than `width` are split
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line.clone()];
    }

    let mut out: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in &line.spans {
        for word in span.content.split_inclusive(' ') {
            let word_width = text_width(word);
            if used > 0 && used + word_width > width {
                out.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }

            if word_width <= width {
                current.push(Span::styled(word.to_string(), span.style));
                used += word_width;
                continue;
            }

            let mut piece = String::new();
            for c in word.chars() {
                let mut buf = [0u8; 4];
                let char_width = text_width(c.encode_utf8(&mut buf));
                if used + char_width > width && used > 0 {
                    if !piece.is_empty() {
                        current.push(Span::styled(std::mem::take(&mut piece), span.style));
                    }
                    out.push(Line::from(std::mem::take(&mut current)));
                    used = 0;
                }
                piece.push(c);
                used += char_width;
            }
            if !piece.is_empty() {
                current.push(Span::styled(piece, span.style));
            }
        }
    }

    if !current.is_empty() {
        out.push(Line::from(current));
    }
    if out.is_empty() {
        out.push(Line::default());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderedText;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn single_indicator_at_a_time() {
        let mut history = ConversationHistory::new(10);
        assert!(history.push_indicator(IndicatorId(1)));
        assert!(!history.push_indicator(IndicatorId(2)));
        assert_eq!(history.indicator_count(), 1);
        assert_eq!(history.indicator(), Some((IndicatorId(1), 0)));
    }

    #[test]
    fn indicator_cycles_three_phases() {
        let mut history = ConversationHistory::new(10);
        history.push_indicator(IndicatorId(1));
        let phases: Vec<usize> = (0..4)
            .map(|_| {
                history.advance_indicator(IndicatorId(1));
                history.indicator().unwrap().1
            })
            .collect();
        assert_eq!(phases, vec![1, 2, 0, 1]);
        assert!(!history.advance_indicator(IndicatorId(9)));
    }

    #[test]
    fn removed_indicator_cannot_advance() {
        let mut history = ConversationHistory::new(10);
        history.push_indicator(IndicatorId(3));
        assert!(history.remove_indicator(IndicatorId(3)));
        assert!(!history.remove_indicator(IndicatorId(3)));
        assert!(!history.advance_indicator(IndicatorId(3)));
    }

    #[test]
    fn oldest_messages_are_evicted_past_cap() {
        let mut history = ConversationHistory::new(2);
        history.push_indicator(IndicatorId(1));
        for text in ["um", "dois", "três"] {
            history.push_message(Message::user(text));
        }
        let texts: Vec<&str> = history.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["dois", "três"]);
        assert_eq!(history.indicator_count(), 1);
    }

    #[test]
    fn clear_keeps_live_indicator() {
        let mut history = ConversationHistory::new(10);
        history.push_message(Message::user("oi"));
        history.push_indicator(IndicatorId(1));
        history.clear_messages();
        assert_eq!(history.message_count(), 0);
        assert_eq!(history.indicator_count(), 1);
    }

    #[test]
    fn new_message_scrolls_to_bottom() {
        let mut history = ConversationHistory::new(10);
        history.max_scroll.set(20);
        history.scroll_up(5);
        assert_eq!(history.scroll_offset(), 5);
        history.push_message(Message::bot("oi", RenderedText::plain("oi")));
        assert_eq!(history.scroll_offset(), 0);
    }

    #[test]
    fn wrap_breaks_on_words_and_long_runs() {
        let line = Line::raw("uma viagem pelas estrelas");
        let wrapped: Vec<String> = wrap_line(&line, 11).iter().map(plain).collect();
        assert_eq!(wrapped, vec!["uma viagem ", "pelas ", "estrelas"]);

        let line = Line::raw("abcdefghij");
        let wrapped: Vec<String> = wrap_line(&line, 4).iter().map(plain).collect();
        assert_eq!(wrapped, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn layout_shows_indicator_phase() {
        let mut history = ConversationHistory::new(10);
        history.push_indicator(IndicatorId(1));
        history.advance_indicator(IndicatorId(1));
        let lines = history.layout_lines(40);
        assert_eq!(plain(&lines[0]), "🪐 Astrolino está digitando..");
    }
}
