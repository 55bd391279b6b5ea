//! HTML export of rendered quests.
//!
//! Disclosures become `<details>`/`<summary>` pairs so the browser handles
//! expand/collapse natively. Every anchor opens in a new browsing context.

use std::fmt::Write;

use crate::markdown::{escape_html, is_safe_href, to_html, NEW_CONTEXT_ATTRS};
use crate::view::{DisclosureKey, Element};

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;}\
details{border:1px solid #ccc;border-radius:4px;margin:.5rem 0;padding:.25rem .75rem;}\
details details{margin-left:1rem;}\
summary{display:flex;gap:.5rem;align-items:baseline;cursor:pointer;}\
summary h2,summary h4{margin:0;}\
.description p{margin:0;}";

/// Render a complete standalone HTML page.
pub fn document(title: &str, elements: &[Element]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(title));
    let _ = writeln!(out, "<style>{STYLE}</style>");
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", escape_html(title));
    for element in elements {
        render(element, &mut out);
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Render one element and its children.
pub fn render(element: &Element, out: &mut String) {
    match element {
        Element::Disclosure { key, open, summary, content } => {
            let (class, id) = match key {
                DisclosureKey::Quest(q) => ("quest", format!("quest-{q}")),
                DisclosureKey::Step(q, s) => ("step", format!("quest-{q}-step-{s}")),
            };
            let _ = write!(out, "<details class=\"{class}\" id=\"{id}\"");
            if *open {
                out.push_str(" open");
            }
            out.push_str(">\n<summary>");
            let title_tag = if class == "quest" { "h2" } else { "h4" };
            for part in summary {
                match part {
                    Element::Title(t) => {
                        let _ = write!(out, "<{title_tag}>{}</{title_tag}>", escape_html(t));
                    }
                    Element::Markdown(md) => {
                        let _ = write!(out, "<div class=\"description\">{}</div>", to_html(md));
                    }
                    other => render(other, out),
                }
            }
            out.push_str("</summary>\n");
            if !content.is_empty() {
                out.push_str("<div class=\"content\">\n");
                for part in content {
                    render(part, out);
                }
                out.push_str("</div>\n");
            }
            out.push_str("</details>\n");
        }
        Element::Checkbox { checked } => {
            let _ = write!(
                out,
                "<input type=\"checkbox\" disabled{}>",
                if *checked { " checked" } else { "" }
            );
        }
        Element::Title(t) => {
            let _ = write!(out, "<h2>{}</h2>", escape_html(t));
        }
        Element::Heading(h) => {
            let _ = writeln!(out, "<h3>{}</h3>", escape_html(h));
        }
        Element::ExternalLink { href, label } => {
            let text = label.as_deref().map(escape_html).unwrap_or_else(|| "&#8599;".into());
            if is_safe_href(href) {
                let _ = write!(out, "<a href=\"{}\"{NEW_CONTEXT_ATTRS}>{text}</a>", escape_html(href));
            } else {
                out.push_str(&text);
            }
        }
        Element::Markdown(md) => out.push_str(&to_html(md)),
        Element::Text(t) => out.push_str(&escape_html(t)),
        Element::List(items) => {
            out.push_str("<ul>\n");
            for item in items {
                out.push_str("<li>");
                for part in item {
                    render(part, out);
                }
                out.push_str("</li>\n");
            }
            out.push_str("</ul>\n");
        }
        Element::Group(children) => {
            out.push_str("<div>\n");
            for child in children {
                render(child, out);
            }
            out.push_str("</div>\n");
        }
        // The native <details> marker already shows the open state.
        Element::Chevron { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{Quest, QuestBook, Reward, Step};
    use crate::store::{CompletionStore, MemoryStore};
    use crate::view::QuestList;

    fn book() -> QuestBook {
        QuestBook {
            quests: vec![Quest {
                id: 4,
                name: "Gems & Glory".into(),
                description: "Ask [Bo](https://wiki/bo).".into(),
                link: "https://wiki/gems".into(),
                steps: vec![Step {
                    id: 1,
                    title: "Mine".into(),
                    details: None,
                }],
                failure_conditions: Some(vec![]),
                rewards: Some(vec![Reward {
                    id: 1,
                    amount: 3,
                    name: "Gem".into(),
                    link: "https://x".into(),
                }]),
            }],
        }
    }

    fn export(open: bool) -> String {
        let book = book();
        let store = CompletionStore::new(MemoryStore::default());
        let list = QuestList::new(&book, open);
        document("Side quests", &list.render(&book, &store, |_| true))
    }

    #[test]
    fn reward_item_links_name_in_new_context() {
        let html = export(true);
        assert!(html.contains(
            "<li>x3 - <a href=\"https://x\" target=\"_blank\" rel=\"noopener noreferrer\">Gem</a></li>"
        ));
    }

    #[test]
    fn empty_failure_conditions_have_no_heading() {
        let html = export(true);
        assert!(!html.contains("Failure conditions"));
        assert!(html.contains("<h3>Rewards</h3>"));
        assert!(html.contains("<h3>Steps</h3>"));
    }

    #[test]
    fn disclosures_carry_open_state() {
        let html = export(true);
        assert!(html.contains("<details class=\"quest\" id=\"quest-4\" open>"));
        assert!(html.contains("<details class=\"step\" id=\"quest-4-step-1\">"));

        let collapsed = export(false);
        assert!(collapsed.contains("<details class=\"quest\" id=\"quest-4\">"));
    }

    #[test]
    fn summary_escapes_and_links_description() {
        let html = export(false);
        assert!(html.contains("<h2>Gems &amp; Glory</h2>"));
        assert!(html.contains("<title>Side quests</title>"));
        assert!(html.contains(
            "<a href=\"https://wiki/bo\" target=\"_blank\" rel=\"noopener noreferrer\">Bo</a>"
        ));
        assert!(html.contains("<input type=\"checkbox\" disabled>"));
    }

    #[test]
    fn every_exported_anchor_opens_in_new_context() {
        let mut book = book();
        let quest = &mut book.quests[0];
        quest.description = r#"See <a href="https://raw">raw</a>."#.into();
        quest.failure_conditions = Some(vec!["[run](javascript:alert(1))".into()]);
        quest.steps[0].details = Some("<script>alert(1)</script>".into());
        quest.rewards.as_mut().unwrap()[0].link = "javascript:steal()".into();

        let store = CompletionStore::new(MemoryStore::default());
        let list = QuestList::new(&book, true);
        let html = document("Side quests", &list.render(&book, &store, |_| true));

        assert!(!html.contains("<script>"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("<li>x3 - Gem</li>"));
        assert_eq!(html.matches("<a ").count(), html.matches(NEW_CONTEXT_ATTRS).count());
    }
}
