//! Markdown rendering for quest descriptions, failure conditions and step details.
//!
//! Markdown is rendered two ways: to styled terminal lines for the TUI and CLI,
//! and to HTML for exports. In both, every hyperlink opens in a new browsing
//! context rather than navigating away from the companion.

use pulldown_cmark::{html, Event, LinkType, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Attributes attached to every emitted HTML anchor.
pub const NEW_CONTEXT_ATTRS: &str = r#" target="_blank" rel="noopener noreferrer""#;

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Schemes that run code instead of navigating.
const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Whether `url` is safe to emit as a hyperlink or hand to an opener.
///
/// Browsers ignore whitespace and control characters inside a scheme, so
/// those are stripped before the check.
pub fn is_safe_href(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    !UNSAFE_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme))
}

/// Render markdown to HTML with all links forced into a new browsing context.
///
/// Raw HTML in the source is escaped and shown as text. Links with an unsafe
/// scheme keep their label but lose the anchor.
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut anchors: Vec<bool> = Vec::new();

    let rewritten = parser.map(|event| match event {
        Event::Start(Tag::Link { link_type, dest_url, title, .. }) => {
            let href = if link_type == LinkType::Email {
                format!("mailto:{dest_url}")
            } else {
                dest_url.to_string()
            };
            if !is_safe_href(&href) {
                anchors.push(false);
                return Event::Text("".into());
            }
            anchors.push(true);
            let mut anchor = format!("<a href=\"{}\"", escape_html(&href));
            if !title.is_empty() {
                anchor.push_str(&format!(" title=\"{}\"", escape_html(&title)));
            }
            anchor.push_str(NEW_CONTEXT_ATTRS);
            anchor.push('>');
            Event::InlineHtml(anchor.into())
        }
        Event::End(TagEnd::Link) => {
            if anchors.pop().unwrap_or(false) {
                Event::InlineHtml("</a>".into())
            } else {
                Event::Text("".into())
            }
        }
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, rewritten);
    html_output
}

/// Escape text for use in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A hyperlink found while rendering markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// Markdown rendered for the terminal.
#[derive(Debug, Default, Clone)]
pub struct MarkdownText {
    pub lines: Vec<Line<'static>>,
    pub links: Vec<Link>,
}

/// Style used for hyperlinks in the terminal.
pub fn link_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED)
}

/// Links in `markdown`, in reading order. Unsafe hrefs are left out.
pub fn links(markdown: &str) -> Vec<Link> {
    to_lines(markdown, Style::default()).links
}

/// Render markdown to styled terminal lines, collecting the links it contains.
pub fn to_lines(markdown: &str, base: Style) -> MarkdownText {
    let mut writer = LineWriter::new(base);
    for event in Parser::new_ext(markdown, options()) {
        writer.handle(event);
    }
    writer.finish()
}

struct LineWriter {
    base: Style,
    styles: Vec<Style>,
    current: Vec<Span<'static>>,
    lines: Vec<Line<'static>>,
    links: Vec<Link>,
    open_link: Option<Link>,
    lists: Vec<Option<u64>>,
}

impl LineWriter {
    fn new(base: Style) -> Self {
        Self {
            base,
            styles: Vec::new(),
            current: Vec::new(),
            lines: Vec::new(),
            links: Vec::new(),
            open_link: None,
            lists: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, modifier: Modifier) {
        let next = self.style().add_modifier(modifier);
        self.styles.push(next);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if let Some(link) = self.open_link.as_mut() {
            link.label.push_str(text);
        }
        let mut parts = text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                self.current.push(Span::styled(part.to_string(), style));
            }
            if parts.peek().is_some() {
                self.flush();
            }
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Emphasis => self.push_style(Modifier::ITALIC),
                Tag::Strong | Tag::Heading { .. } => self.push_style(Modifier::BOLD),
                Tag::Strikethrough => self.push_style(Modifier::CROSSED_OUT),
                Tag::Link { dest_url, .. } => {
                    self.styles.push(link_style());
                    self.open_link = Some(Link {
                        label: String::new(),
                        url: dest_url.to_string(),
                    });
                }
                Tag::List(start) => {
                    self.flush();
                    self.lists.push(start);
                }
                Tag::Item => {
                    self.flush();
                    let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                    let marker = match self.lists.last_mut() {
                        Some(Some(n)) => {
                            let m = format!("{indent}{n}. ");
                            *n += 1;
                            m
                        }
                        _ => format!("{indent}• "),
                    };
                    self.current.push(Span::styled(marker, self.base));
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                    self.styles.pop();
                }
                TagEnd::Heading(_) => {
                    self.styles.pop();
                    self.flush();
                }
                TagEnd::Link => {
                    self.styles.pop();
                    if let Some(link) = self.open_link.take().filter(|l| is_safe_href(&l.url)) {
                        self.links.push(link);
                    }
                }
                TagEnd::List(_) => {
                    self.flush();
                    self.lists.pop();
                }
                TagEnd::Paragraph | TagEnd::Item | TagEnd::CodeBlock => self.flush(),
                _ => {}
            },
            Event::Text(text) => {
                let style = self.style();
                self.push_text(&text, style);
            }
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.push_text(&code, style);
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_text(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.current.push(Span::styled(marker, self.base));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> MarkdownText {
        self.flush();
        MarkdownText {
            lines: self.lines,
            links: self.links,
        }
    }
}
