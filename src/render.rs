//! Markdown rendering for bot-authored text
//!
//! Bot replies may carry lightweight markup. They are converted into styled
//! terminal lines; raw HTML is kept as inert literal text and control
//! characters are removed so a reply can never drive the terminal.

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use serde::{Deserialize, Serialize};

/// Renderer switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Obfuscate e-mail autolinks (`user [at] host [dot] com`)
    pub mangle: bool,
    /// Append a generated `#anchor` slug to headings
    pub header_ids: bool,
}

/// Display-ready text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedText {
    pub lines: Vec<Line<'static>>,
}

impl RenderedText {
    /// Unstyled text, one line per `\n`
    pub fn plain(text: &str) -> Self {
        let lines = sanitize(text)
            .split('\n')
            .map(|line| Line::raw(line.to_string()))
            .collect();
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.spans.is_empty())
    }

    /// Concatenated span contents, lines joined with `\n`
    pub fn to_plain_string(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Converts bot markup into display text
pub trait Renderer {
    fn render(&self, markup: &str) -> RenderedText;
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, markup: &str) -> RenderedText {
        let source = sanitize(markup);
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut writer = LineWriter::new(&self.options);
        for event in Parser::new_ext(&source, options) {
            writer.handle(event);
        }
        writer.finish()
    }
}

/// Drops control characters (ESC included) except newlines; tabs become spaces
pub fn sanitize(text: &str) -> String {
    let mut clean = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => clean.push('\n'),
            '\t' => clean.push_str("    "),
            c if c.is_control() => {}
            c => clean.push(c),
        }
    }
    clean
}

fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn mangle_email(address: &str) -> String {
    address.replace('@', " [at] ").replace('.', " [dot] ")
}

struct PendingLink {
    kind: LinkType,
    dest: String,
    text: String,
    image: bool,
}

struct LineWriter<'o> {
    options: &'o RenderOptions,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    heading: Option<String>,
    link: Option<PendingLink>,
}

impl<'o> LineWriter<'o> {
    fn new(options: &'o RenderOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            heading: None,
            link: None,
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    self.code_text(&text);
                } else {
                    self.text(&text);
                }
            }
            Event::Code(code) => {
                self.track_text(&code);
                let style = self.style().patch(Style::default().fg(Color::Yellow));
                self.push_span(code.to_string(), style);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = Style::default().fg(Color::DarkGray);
                let mut first = true;
                for line in html.trim_end_matches('\n').split('\n') {
                    if !first {
                        self.flush_line();
                    }
                    first = false;
                    self.push_span(line.to_string(), style);
                }
            }
            Event::SoftBreak => self.push_span(" ".to_string(), self.style()),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.block_gap();
                self.push_span("─".repeat(24), Style::default().fg(Color::DarkGray));
                self.flush_line();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(marker.to_string(), self.style());
            }
            Event::FootnoteReference(label) => {
                self.push_span(format!("[{label}]"), self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
            }
            Tag::Heading { .. } => {
                self.block_gap();
                self.push_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                );
                self.heading = Some(String::new());
            }
            Tag::BlockQuote => {
                self.block_gap();
                self.quote_depth += 1;
                self.push_style(
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::ITALIC),
                );
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.push_span(
                            format!("┌ {lang}"),
                            Style::default().fg(Color::DarkGray),
                        );
                        self.flush_line();
                    }
                }
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.flush_line();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.lists.len().saturating_sub(1);
                let bullet = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let bullet = format!("{number}. ");
                        *number += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.push_span(
                    format!("{}{bullet}", "  ".repeat(depth)),
                    Style::default().fg(Color::Magenta),
                );
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => {
                self.link = Some(PendingLink {
                    kind: link_type,
                    dest: dest_url.to_string(),
                    text: String::new(),
                    image: false,
                });
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Tag::Image { dest_url, .. } => {
                self.push_span("🖼 ".to_string(), self.style());
                self.link = Some(PendingLink {
                    kind: LinkType::Inline,
                    dest: dest_url.to_string(),
                    text: String::new(),
                    image: true,
                });
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_line(),
            TagEnd::Heading(_) => {
                if let Some(text) = self.heading.take() {
                    if self.options.header_ids {
                        let slug = slugify(&text);
                        if !slug.is_empty() {
                            self.push_span(
                                format!(" #{slug}"),
                                Style::default().fg(Color::DarkGray),
                            );
                        }
                    }
                }
                self.pop_style();
                self.flush_line();
            }
            TagEnd::BlockQuote => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
            }
            TagEnd::CodeBlock => {
                self.flush_line();
                self.in_code_block = false;
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link | TagEnd::Image => {
                self.pop_style();
                if let Some(link) = self.link.take() {
                    let autolink = matches!(link.kind, LinkType::Autolink | LinkType::Email);
                    if link.image || (!autolink && link.dest != link.text) {
                        self.push_span(
                            format!(" ({})", link.dest),
                            Style::default().fg(Color::DarkGray),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let email = matches!(
            self.link.as_ref().map(|link| link.kind),
            Some(LinkType::Email)
        );
        let text = if email && self.options.mangle {
            mangle_email(text)
        } else {
            text.to_string()
        };
        self.track_text(&text);
        self.push_span(text, self.style());
    }

    fn code_text(&mut self, text: &str) {
        let gutter = Style::default().fg(Color::DarkGray);
        let code = Style::default().fg(Color::Yellow);
        for line in text.trim_end_matches('\n').split('\n') {
            self.push_span("│ ".to_string(), gutter);
            self.push_span(line.to_string(), code);
            self.flush_line();
        }
    }

    fn track_text(&mut self, text: &str) {
        if let Some(heading) = self.heading.as_mut() {
            heading.push_str(text);
        }
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(text);
        }
    }

    fn push_span(&mut self, content: String, style: Style) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current.push(Span::styled(
                "▎ ".repeat(self.quote_depth),
                Style::default().fg(Color::DarkGray),
            ));
        }
        self.current.push(Span::styled(content, style));
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, style: Style) {
        let patched = self.style().patch(style);
        self.styles.push(patched);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    /// Blank line between top-level blocks
    fn block_gap(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> RenderedText {
        self.flush_line();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        RenderedText { lines: self.lines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markup: &str) -> RenderedText {
        MarkdownRenderer::default().render(markup)
    }

    fn span_with<'a>(text: &'a RenderedText, content: &str) -> Option<&'a Span<'static>> {
        text.lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .find(|span| span.content == content)
    }

    #[test]
    fn renders_paragraph_text() {
        let rendered = render("hello");
        assert_eq!(rendered.to_plain_string(), "hello");
    }

    #[test]
    fn strong_text_is_bold() {
        let rendered = render("um **planeta** azul");
        let span = span_with(&rendered, "planeta").unwrap();
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(rendered.to_plain_string(), "um planeta azul");
    }

    #[test]
    fn raw_html_stays_literal() {
        let rendered = render("<script>alert(1)</script>");
        assert!(rendered.to_plain_string().contains("<script>alert(1)</script>"));
    }

    #[test]
    fn escape_sequences_are_stripped() {
        let rendered = render("\u{1b}[31mvermelho");
        let plain = rendered.to_plain_string();
        assert!(!plain.contains('\u{1b}'));
        assert!(plain.contains("vermelho"));
    }

    #[test]
    fn plain_text_is_not_interpreted() {
        let rendered = RenderedText::plain("**não** <b>negrito</b>\nsegunda");
        assert_eq!(rendered.lines.len(), 2);
        assert_eq!(rendered.to_plain_string(), "**não** <b>negrito</b>\nsegunda");
    }

    #[test]
    fn headings_have_no_anchor_by_default() {
        let rendered = render("# Olá Mundo");
        assert_eq!(rendered.to_plain_string(), "Olá Mundo");
    }

    #[test]
    fn headings_get_anchor_when_enabled() {
        let renderer = MarkdownRenderer::new(RenderOptions {
            header_ids: true,
            ..RenderOptions::default()
        });
        let rendered = renderer.render("## Olá Mundo!");
        assert_eq!(rendered.to_plain_string(), "Olá Mundo! #olá-mundo");
    }

    #[test]
    fn email_autolinks_are_verbatim_unless_mangled() {
        let rendered = render("<astro@exemplo.com>");
        assert_eq!(rendered.to_plain_string(), "astro@exemplo.com");

        let renderer = MarkdownRenderer::new(RenderOptions {
            mangle: true,
            ..RenderOptions::default()
        });
        let rendered = renderer.render("<astro@exemplo.com>");
        assert_eq!(
            rendered.to_plain_string(),
            "astro [at] exemplo [dot] com"
        );
    }

    #[test]
    fn links_show_their_destination() {
        let rendered = render("[site](https://exemplo.com)");
        assert_eq!(rendered.to_plain_string(), "site (https://exemplo.com)");
    }

    #[test]
    fn lists_get_bullets_and_numbers() {
        let rendered = render("- Marte\n- Vênus\n\n1. um\n2. dois");
        assert_eq!(
            rendered.to_plain_string(),
            "• Marte\n• Vênus\n\n1. um\n2. dois"
        );
    }

    #[test]
    fn code_blocks_keep_their_lines() {
        let rendered = render("```rust\nlet x = 1;\nlet y = 2;\n```");
        assert_eq!(
            rendered.to_plain_string(),
            "┌ rust\n│ let x = 1;\n│ let y = 2;"
        );
    }

    #[test]
    fn blocks_are_separated_by_blank_line() {
        let rendered = render("primeiro\n\nsegundo");
        assert_eq!(rendered.to_plain_string(), "primeiro\n\nsegundo");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Rumo às   Estrelas -- já "), "rumo-às-estrelas-já");
    }
}
