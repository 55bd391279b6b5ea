//! Layout of rendered quest elements into terminal lines.
//!
//! The same layout feeds the interactive page and the plain-text `view` command.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::markdown::{link_style, to_lines};
use crate::tui::colors::{DONE_GREEN, GOLD};
use crate::view::{DisclosureKey, Element};

/// Terminal lines for a page of quests, with the line each disclosure's
/// summary starts on.
#[derive(Debug, Default)]
pub struct Page {
    pub lines: Vec<Line<'static>>,
    pub anchors: Vec<(DisclosureKey, usize)>,
}

impl Page {
    pub fn anchor(&self, key: DisclosureKey) -> Option<usize> {
        self.anchors.iter().find(|(k, _)| *k == key).map(|(_, line)| *line)
    }

    /// Lines as plain strings, styles dropped.
    pub fn plain(&self) -> Vec<String> {
        self.lines.iter().map(line_text).collect()
    }
}

fn line_text(line: &Line) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Lay out a sequence of elements. Closed disclosures show only their summary.
pub fn layout(elements: &[Element]) -> Page {
    let mut page = Page::default();
    for element in elements {
        push_element(element, 0, &mut page);
    }
    page
}

fn push_markdown(md: &str, depth: usize, page: &mut Page) {
    for line in to_lines(md, Style::default()).lines {
        let mut spans = vec![Span::raw(indent(depth))];
        spans.extend(line.spans);
        page.lines.push(Line::from(spans));
    }
}

fn push_element(element: &Element, depth: usize, page: &mut Page) {
    match element {
        Element::Disclosure { key, open, summary, content } => {
            page.anchors.push((*key, page.lines.len()));
            let title_style = match key {
                DisclosureKey::Quest(_) => Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
                DisclosureKey::Step(..) => Style::default().add_modifier(Modifier::BOLD),
            };

            let mut spans = vec![Span::raw(indent(depth))];
            let mut descriptions = Vec::new();
            for part in summary {
                match part {
                    Element::Checkbox { checked: true } => {
                        spans.push(Span::styled("[x] ", Style::default().fg(DONE_GREEN)))
                    }
                    Element::Checkbox { checked: false } => spans.push(Span::raw("[ ] ")),
                    Element::Title(t) => spans.push(Span::styled(t.clone(), title_style)),
                    Element::ExternalLink { label, .. } => {
                        let text = label.clone().unwrap_or_else(|| "↗".to_string());
                        spans.push(Span::raw(" "));
                        spans.push(Span::styled(text, link_style()));
                    }
                    Element::Chevron { open } => {
                        spans.push(Span::styled(
                            if *open { "  ▴" } else { "  ▾" },
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    Element::Markdown(md) => descriptions.push(md),
                    _ => {}
                }
            }
            page.lines.push(Line::from(spans));
            for md in descriptions {
                push_markdown(md, depth + 1, page);
            }

            if *open {
                for part in content {
                    push_element(part, depth + 1, page);
                }
            }
        }
        Element::Heading(h) => page.lines.push(Line::from(vec![
            Span::raw(indent(depth)),
            Span::styled(
                h.clone(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ),
        ])),
        Element::Title(t) => page.lines.push(Line::from(vec![
            Span::raw(indent(depth)),
            Span::styled(t.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ])),
        Element::Markdown(md) => push_markdown(md, depth, page),
        Element::Text(t) => page
            .lines
            .push(Line::from(vec![Span::raw(indent(depth)), Span::raw(t.clone())])),
        Element::ExternalLink { href, label } => page.lines.push(Line::from(vec![
            Span::raw(indent(depth)),
            Span::styled(label.clone().unwrap_or_else(|| href.clone()), link_style()),
        ])),
        Element::List(items) => {
            for item in items {
                push_list_item(item, depth, page);
            }
        }
        Element::Group(children) => {
            for child in children {
                push_element(child, depth, page);
            }
        }
        Element::Checkbox { .. } | Element::Chevron { .. } => {}
    }
}

/// One bullet; inline parts share the bullet line, extra markdown lines hang
/// underneath.
fn push_list_item(item: &[Element], depth: usize, page: &mut Page) {
    let mut first = vec![Span::raw(format!("{}• ", indent(depth)))];
    let mut rest: Vec<Line<'static>> = Vec::new();

    for part in item {
        match part {
            Element::Text(t) => first.push(Span::raw(t.clone())),
            Element::ExternalLink { href, label } => first.push(Span::styled(
                label.clone().unwrap_or_else(|| href.clone()),
                link_style(),
            )),
            Element::Markdown(md) => {
                let mut lines = to_lines(md, Style::default()).lines.into_iter();
                if let Some(line) = lines.next() {
                    first.extend(line.spans);
                }
                for line in lines {
                    let mut spans = vec![Span::raw(format!("{}  ", indent(depth)))];
                    spans.extend(line.spans);
                    rest.push(Line::from(spans));
                }
            }
            _ => {}
        }
    }

    page.lines.push(Line::from(first));
    page.lines.extend(rest);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest(open: bool, step_open: bool) -> Element {
        Element::Disclosure {
            key: DisclosureKey::Quest(1),
            open,
            summary: vec![
                Element::Checkbox { checked: true },
                Element::Title("The Lost Ring".into()),
                Element::ExternalLink {
                    href: "https://wiki".into(),
                    label: None,
                },
                Element::Markdown("Find it.".into()),
                Element::Chevron { open },
            ],
            content: vec![
                Element::Heading("Rewards".into()),
                Element::List(vec![vec![
                    Element::Text("x3 - ".into()),
                    Element::ExternalLink {
                        href: "https://x".into(),
                        label: Some("Gem".into()),
                    },
                ]]),
                Element::Heading("Steps".into()),
                Element::Group(vec![Element::Disclosure {
                    key: DisclosureKey::Step(1, 1),
                    open: step_open,
                    summary: vec![
                        Element::Checkbox { checked: false },
                        Element::Title("Talk".into()),
                        Element::Chevron { open: step_open },
                    ],
                    content: vec![Element::Markdown("Say *hi*.".into())],
                }]),
            ],
        }
    }

    #[test]
    fn collapsed_quest_shows_summary_only() {
        let page = layout(&[quest(false, false)]);
        assert_eq!(page.plain(), vec!["[x] The Lost Ring ↗  ▾", "    Find it."]);
        assert_eq!(page.anchors, vec![(DisclosureKey::Quest(1), 0)]);
    }

    #[test]
    fn expanded_quest_lays_out_content() {
        let page = layout(&[quest(true, true)]);
        assert_eq!(
            page.plain(),
            vec![
                "[x] The Lost Ring ↗  ▴",
                "    Find it.",
                "    Rewards",
                "    • x3 - Gem",
                "    Steps",
                "    [ ] Talk  ▴",
                "        Say hi.",
            ]
        );
        assert_eq!(page.anchor(DisclosureKey::Step(1, 1)), Some(5));
    }

    #[test]
    fn closed_step_hides_its_details() {
        let page = layout(&[quest(true, false)]);
        assert_eq!(page.plain().last().unwrap(), "    [ ] Talk  ▾");
    }
}
