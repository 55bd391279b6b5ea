//! Quest presentation: disclosures, toggle events and the element tree.
//!
//! A `QuestView` owns the render-scoped open/closed state of one quest and its
//! steps. It never stores completion state; that is read from and written to a
//! `CompletionStore` passed in at render or click time. Rendering produces an
//! `Element` tree that the terminal and HTML backends turn into output.

use tracing::trace;

use crate::error::Result;
use crate::markdown::{self, is_safe_href, Link};
use crate::quest::{Quest, QuestBook, QuestId, Step, StepId};
use crate::store::{CompletionRecord, CompletionStore, KeyValueStore};

/// Identifies a disclosure on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisclosureKey {
    Quest(QuestId),
    Step(QuestId, StepId),
}

impl DisclosureKey {
    pub fn quest(&self) -> QuestId {
        match *self {
            DisclosureKey::Quest(q) | DisclosureKey::Step(q, _) => q,
        }
    }
}

/// Open/close notification fired by a disclosure after it changed state.
///
/// Events bubble from the target disclosure outwards until a handler stops them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleEvent {
    target: DisclosureKey,
    open: bool,
    stopped: bool,
}

impl ToggleEvent {
    pub fn new(target: DisclosureKey, open: bool) -> Self {
        Self {
            target,
            open,
            stopped: false,
        }
    }

    /// Open state of the target after the toggle.
    pub fn open(&self) -> bool {
        self.open
    }

    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }
}

/// Collapsed/expanded state of one disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disclosure {
    open: bool,
}

impl Disclosure {
    pub fn new(open: bool) -> Self {
        Self { open }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Adopt the target's new state and keep the event from reaching ancestors.
    fn on_toggle(&mut self, event: &mut ToggleEvent) {
        self.open = event.open();
        event.stop_propagation();
    }
}

/// Rendered output, independent of the backend that displays it.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Disclosure {
        key: DisclosureKey,
        open: bool,
        summary: Vec<Element>,
        content: Vec<Element>,
    },
    Checkbox {
        checked: bool,
    },
    Title(String),
    Heading(String),
    /// Always opens in a new browsing context. No label means icon only.
    ExternalLink {
        href: String,
        label: Option<String>,
    },
    Markdown(String),
    Text(String),
    List(Vec<Vec<Element>>),
    Group(Vec<Element>),
    Chevron {
        open: bool,
    },
}

impl Element {
    /// Links a reader can follow from this element, in display order.
    /// Nested disclosures are skipped; their links belong to them.
    pub fn links(&self) -> Vec<Link> {
        fn walk(e: &Element, out: &mut Vec<Link>) {
            match e {
                Element::ExternalLink { href, label } if is_safe_href(href) => out.push(Link {
                    label: label.clone().unwrap_or_else(|| href.clone()),
                    url: href.clone(),
                }),
                Element::Markdown(md) => out.extend(markdown::links(md)),
                Element::List(items) => items.iter().flatten().for_each(|c| walk(c, out)),
                Element::Group(children) => children.iter().for_each(|c| walk(c, out)),
                _ => {}
            }
        }
        let mut out = Vec::new();
        match self {
            Element::Disclosure { summary, content, .. } => {
                summary.iter().chain(content).for_each(|c| walk(c, &mut out))
            }
            other => walk(other, &mut out),
        }
        out
    }

    /// Find a nested element by disclosure key.
    pub fn find(&self, wanted: DisclosureKey) -> Option<&Element> {
        match self {
            Element::Disclosure { key, summary, content, .. } => {
                if *key == wanted {
                    return Some(self);
                }
                summary.iter().chain(content).find_map(|c| c.find(wanted))
            }
            Element::Group(children) => children.iter().find_map(|c| c.find(wanted)),
            Element::List(items) => items.iter().flatten().find_map(|c| c.find(wanted)),
            _ => None,
        }
    }
}

/// Disclosure for one step, carrying the id of the quest that owns it.
#[derive(Debug, Clone)]
pub struct StepView {
    quest_id: QuestId,
    step_id: StepId,
    disclosure: Disclosure,
}

impl StepView {
    /// Steps always start collapsed.
    pub fn new(quest_id: QuestId, step: &Step) -> Self {
        Self {
            quest_id,
            step_id: step.id,
            disclosure: Disclosure::new(false),
        }
    }

    pub fn key(&self) -> DisclosureKey {
        DisclosureKey::Step(self.quest_id, self.step_id)
    }

    pub fn is_open(&self) -> bool {
        self.disclosure.is_open()
    }

    /// Flip this step's completion in its quest's record. Returns the new state.
    pub fn click_checkbox<S>(&self, store: &mut CompletionStore<S>) -> Result<bool>
    where
        S: KeyValueStore<QuestId, CompletionRecord>,
    {
        let done = !store.read(self.quest_id).is_step_done(self.step_id);
        store.set_step(self.quest_id, self.step_id, done)?;
        Ok(done)
    }

    pub fn render(&self, step: &Step, record: &CompletionRecord) -> Element {
        let open = self.disclosure.is_open();
        let summary = vec![
            Element::Checkbox {
                checked: record.is_step_done(self.step_id),
            },
            Element::Title(step.title.clone()),
            Element::Chevron { open },
        ];
        let content = match step.details.as_deref() {
            Some(details) if !details.trim().is_empty() => vec![Element::Markdown(details.to_string())],
            _ => Vec::new(),
        };
        Element::Disclosure {
            key: self.key(),
            open,
            summary,
            content,
        }
    }
}

/// Two-part disclosure for one quest: summary row plus expandable content.
#[derive(Debug, Clone)]
pub struct QuestView {
    quest_id: QuestId,
    disclosure: Disclosure,
    steps: Vec<StepView>,
}

impl QuestView {
    pub fn new(quest: &Quest, open_by_default: bool) -> Self {
        Self {
            quest_id: quest.id,
            disclosure: Disclosure::new(open_by_default),
            steps: quest.steps.iter().map(|s| StepView::new(quest.id, s)).collect(),
        }
    }

    pub fn key(&self) -> DisclosureKey {
        DisclosureKey::Quest(self.quest_id)
    }

    pub fn is_open(&self) -> bool {
        self.disclosure.is_open()
    }

    pub fn set_open(&mut self, open: bool) {
        self.disclosure.set_open(open);
    }

    pub fn step(&self, step_id: StepId) -> Option<&StepView> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Toggle the disclosure identified by `target` and bubble the resulting
    /// event from the innermost disclosure outwards. The returned event tells
    /// the caller whether it escaped this quest.
    pub fn toggle(&mut self, target: DisclosureKey) -> Option<ToggleEvent> {
        if target.quest() != self.quest_id {
            return None;
        }

        let mut event = match target {
            DisclosureKey::Quest(_) => ToggleEvent::new(target, !self.disclosure.is_open()),
            DisclosureKey::Step(_, step_id) => {
                let step = self.steps.iter_mut().find(|s| s.step_id == step_id)?;
                let mut event = ToggleEvent::new(target, !step.disclosure.is_open());
                step.disclosure.on_toggle(&mut event);
                event
            }
        };

        if !event.is_propagation_stopped() {
            self.disclosure.on_toggle(&mut event);
        }
        trace!(?target, open = event.open(), "disclosure toggled");
        Some(event)
    }

    /// Flip the quest-level checkbox. Returns the new completion state.
    pub fn click_checkbox<S>(&self, store: &mut CompletionStore<S>) -> Result<bool>
    where
        S: KeyValueStore<QuestId, CompletionRecord>,
    {
        let state = !store.is_complete(self.quest_id);
        store.set_total(self.quest_id, state)?;
        Ok(state)
    }

    pub fn render<S>(&self, quest: &Quest, store: &CompletionStore<S>) -> Element
    where
        S: KeyValueStore<QuestId, CompletionRecord>,
    {
        let record = store.read(self.quest_id);
        let open = self.disclosure.is_open();

        let mut summary = vec![
            Element::Checkbox {
                checked: record.is_complete(),
            },
            Element::Title(quest.name.clone()),
            Element::ExternalLink {
                href: quest.link.clone(),
                label: None,
            },
        ];
        if !quest.description.trim().is_empty() {
            summary.push(Element::Markdown(quest.description.clone()));
        }
        summary.push(Element::Chevron { open });

        Element::Disclosure {
            key: self.key(),
            open,
            summary,
            content: self.render_content(quest, &record),
        }
    }

    fn render_content(&self, quest: &Quest, record: &CompletionRecord) -> Vec<Element> {
        let mut content = Vec::new();

        if let Some(conditions) = quest.failure_conditions.as_ref().filter(|c| !c.is_empty()) {
            content.push(Element::Heading("Failure conditions".into()));
            content.push(Element::List(
                conditions
                    .iter()
                    .map(|c| vec![Element::Markdown(c.clone())])
                    .collect(),
            ));
        }

        if let Some(rewards) = quest.rewards.as_ref().filter(|r| !r.is_empty()) {
            content.push(Element::Heading("Rewards".into()));
            content.push(Element::List(
                rewards
                    .iter()
                    .map(|r| {
                        vec![
                            Element::Text(format!("x{} - ", r.amount)),
                            Element::ExternalLink {
                                href: r.link.clone(),
                                label: Some(r.name.clone()),
                            },
                        ]
                    })
                    .collect(),
            ));
        }

        if !quest.steps.is_empty() {
            content.push(Element::Heading("Steps".into()));
            content.push(Element::Group(
                quest
                    .steps
                    .iter()
                    .filter_map(|step| self.step(step.id).map(|view| view.render(step, record)))
                    .collect(),
            ));
        }

        content
    }
}

/// Every quest of a book, in content order.
#[derive(Debug, Clone, Default)]
pub struct QuestList {
    views: Vec<QuestView>,
}

impl QuestList {
    pub fn new(book: &QuestBook, open_by_default: bool) -> Self {
        Self {
            views: book
                .quests
                .iter()
                .map(|q| QuestView::new(q, open_by_default))
                .collect(),
        }
    }

    pub fn view(&self, quest_id: QuestId) -> Option<&QuestView> {
        self.views.iter().find(|v| v.quest_id == quest_id)
    }

    /// Toggle a disclosure. The list itself has no open state; an event that
    /// escapes its quest is only logged.
    pub fn toggle(&mut self, target: DisclosureKey) -> Option<ToggleEvent> {
        let view = self.views.iter_mut().find(|v| v.quest_id == target.quest())?;
        let event = view.toggle(target)?;
        if !event.is_propagation_stopped() {
            trace!(key = ?event.target, "toggle event reached the quest list");
        }
        Some(event)
    }

    pub fn set_all_open(&mut self, open: bool) {
        self.views.iter_mut().for_each(|v| v.set_open(open));
    }

    /// Keys of the disclosures a user can currently reach: every quest, plus
    /// the steps of open quests.
    pub fn visible_keys(&self, include: impl Fn(QuestId) -> bool) -> Vec<DisclosureKey> {
        let mut keys = Vec::new();
        for view in self.views.iter().filter(|v| include(v.quest_id)) {
            keys.push(view.key());
            if view.is_open() {
                keys.extend(view.steps.iter().map(StepView::key));
            }
        }
        keys
    }

    pub fn render<S>(
        &self,
        book: &QuestBook,
        store: &CompletionStore<S>,
        include: impl Fn(QuestId) -> bool,
    ) -> Vec<Element>
    where
        S: KeyValueStore<QuestId, CompletionRecord>,
    {
        self.views
            .iter()
            .filter(|v| include(v.quest_id))
            .filter_map(|v| book.get(v.quest_id).map(|q| v.render(q, store)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::Reward;
    use crate::store::MemoryStore;

    type Store = CompletionStore<MemoryStore<QuestId, CompletionRecord>>;

    fn store() -> Store {
        CompletionStore::new(MemoryStore::default())
    }

    fn step(id: StepId, title: &str) -> Step {
        Step {
            id,
            title: title.into(),
            details: Some(format!("Details for *{title}*")),
        }
    }

    fn quest() -> Quest {
        Quest {
            id: 1,
            name: "The Lost Ring".into(),
            description: "Find the ring.".into(),
            link: "https://wiki/lost-ring".into(),
            steps: vec![step(1, "Talk to Ava"), step(2, "Search the well")],
            failure_conditions: None,
            rewards: None,
        }
    }

    /// Concatenated visible text, markdown left unrendered.
    fn plain_text(e: &Element) -> String {
        match e {
            Element::Disclosure { summary, content, .. } => {
                summary.iter().chain(content).map(plain_text).collect()
            }
            Element::Title(t) | Element::Heading(t) | Element::Markdown(t) | Element::Text(t) => t.clone(),
            Element::ExternalLink { label: Some(l), .. } => l.clone(),
            Element::List(items) => items.iter().flatten().map(plain_text).collect(),
            Element::Group(children) => children.iter().map(plain_text).collect(),
            _ => String::new(),
        }
    }

    fn content(element: &Element) -> &[Element] {
        match element {
            Element::Disclosure { content, .. } => content,
            other => panic!("not a disclosure: {other:?}"),
        }
    }

    fn headings(element: &Element) -> Vec<String> {
        content(element)
            .iter()
            .filter_map(|e| match e {
                Element::Heading(h) => Some(h.clone()),
                _ => None,
            })
            .collect()
    }

    fn is_open(element: &Element) -> bool {
        matches!(element, Element::Disclosure { open: true, .. })
    }

    #[test]
    fn quest_starts_with_requested_state_and_steps_collapsed() {
        let q = quest();
        let open = QuestView::new(&q, true);
        assert!(open.is_open());
        assert!(open.steps.iter().all(|s| !s.is_open()));
        assert!(!QuestView::new(&q, false).is_open());
    }

    #[test]
    fn empty_failure_conditions_render_no_heading() {
        let mut q = quest();
        q.failure_conditions = Some(vec![]);
        let el = QuestView::new(&q, true).render(&q, &store());
        assert!(!headings(&el).contains(&"Failure conditions".to_string()));
    }

    #[test]
    fn one_failure_condition_renders_one_item() {
        let mut q = quest();
        q.failure_conditions = Some(vec!["Ava **dies**".into()]);
        let el = QuestView::new(&q, true).render(&q, &store());
        assert_eq!(headings(&el)[0], "Failure conditions");
        match &content(&el)[1] {
            Element::List(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0], vec![Element::Markdown("Ava **dies**".into())]);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn reward_renders_amount_and_linked_name() {
        let mut q = quest();
        q.rewards = Some(vec![Reward {
            id: 1,
            amount: 3,
            name: "Gem".into(),
            link: "https://x".into(),
        }]);
        let el = QuestView::new(&q, true).render(&q, &store());
        let list = content(&el)
            .iter()
            .skip_while(|e| **e != Element::Heading("Rewards".into()))
            .nth(1)
            .expect("rewards list");
        assert_eq!(
            *list,
            Element::List(vec![vec![
                Element::Text("x3 - ".into()),
                Element::ExternalLink {
                    href: "https://x".into(),
                    label: Some("Gem".into()),
                },
            ]])
        );
        assert_eq!(plain_text(list), "x3 - Gem");
    }

    #[test]
    fn quest_without_steps_renders_no_steps_heading() {
        let mut q = quest();
        q.steps.clear();
        let el = QuestView::new(&q, true).render(&q, &store());
        assert!(headings(&el).is_empty());
        assert!(content(&el).is_empty());
    }

    #[test]
    fn two_steps_render_collapsed_and_toggle_independently() {
        let q = quest();
        let mut view = QuestView::new(&q, true);
        let s1 = DisclosureKey::Step(1, 1);
        let s2 = DisclosureKey::Step(1, 2);

        let el = view.render(&q, &store());
        assert_eq!(headings(&el), vec!["Steps".to_string()]);
        assert!(!is_open(el.find(s1).unwrap()));
        assert!(!is_open(el.find(s2).unwrap()));

        view.toggle(s1);
        let el = view.render(&q, &store());
        assert!(is_open(el.find(s1).unwrap()));
        assert!(!is_open(el.find(s2).unwrap()));
        assert!(is_open(&el));
    }

    #[test]
    fn step_toggle_never_reaches_the_parent() {
        let q = quest();
        let mut view = QuestView::new(&q, true);

        // Opening then closing a step must leave the open quest alone.
        for expected in [true, false] {
            let event = view.toggle(DisclosureKey::Step(1, 2)).unwrap();
            assert_eq!(event.open(), expected);
            assert!(event.is_propagation_stopped());
            assert!(view.is_open());
        }
    }

    #[test]
    fn quest_toggle_stops_at_the_quest() {
        let q = quest();
        let book = QuestBook { quests: vec![q] };
        let mut list = QuestList::new(&book, false);

        let event = list.toggle(DisclosureKey::Quest(1)).unwrap();
        assert!(event.is_propagation_stopped());
        assert!(list.view(1).unwrap().is_open());
        assert!(list.toggle(DisclosureKey::Quest(9)).is_none());
        assert!(list.toggle(DisclosureKey::Step(1, 9)).is_none());
    }

    #[test]
    fn collapsed_quest_keeps_content_but_reports_closed() {
        let q = quest();
        let view = QuestView::new(&q, false);
        let el = view.render(&q, &store());
        assert!(!is_open(&el));
        match &el {
            Element::Disclosure { summary, .. } => {
                assert!(summary.contains(&Element::Chevron { open: false }));
                assert!(summary.contains(&Element::ExternalLink {
                    href: "https://wiki/lost-ring".into(),
                    label: None,
                }));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn checkbox_clicks_write_through_the_store() {
        let q = quest();
        let view = QuestView::new(&q, false);
        let mut store = store();

        assert!(view.click_checkbox(&mut store).unwrap());
        let el = view.render(&q, &store);
        match &el {
            Element::Disclosure { summary, .. } => assert_eq!(summary[0], Element::Checkbox { checked: true }),
            _ => unreachable!(),
        }
        assert!(!view.click_checkbox(&mut store).unwrap());
        assert_eq!(store.read(1).total, 0);
    }

    #[test]
    fn step_checkbox_updates_its_slice_of_the_record() {
        let q = quest();
        let view = QuestView::new(&q, true);
        let mut store = store();

        assert!(view.step(2).unwrap().click_checkbox(&mut store).unwrap());
        let record = store.read(1);
        assert!(record.is_step_done(2));
        assert!(!record.is_step_done(1));
        assert!(record.is_complete());

        let el = view.render(&q, &store);
        match el.find(DisclosureKey::Step(1, 2)).unwrap() {
            Element::Disclosure { summary, .. } => assert_eq!(summary[0], Element::Checkbox { checked: true }),
            _ => unreachable!(),
        }
    }

    #[test]
    fn visible_keys_follow_open_quests() {
        let mut other = quest();
        other.id = 2;
        let book = QuestBook {
            quests: vec![quest(), other],
        };
        let mut list = QuestList::new(&book, false);
        assert_eq!(
            list.visible_keys(|_| true),
            vec![DisclosureKey::Quest(1), DisclosureKey::Quest(2)]
        );

        list.toggle(DisclosureKey::Quest(2));
        assert_eq!(
            list.visible_keys(|_| true),
            vec![
                DisclosureKey::Quest(1),
                DisclosureKey::Quest(2),
                DisclosureKey::Step(2, 1),
                DisclosureKey::Step(2, 2),
            ]
        );
        assert_eq!(list.visible_keys(|id| id != 2), vec![DisclosureKey::Quest(1)]);
        assert_eq!(list.render(&book, &store(), |_| true).len(), 2);
    }

    #[test]
    fn links_belong_to_their_own_disclosure() {
        let mut q = quest();
        q.description = "Ask [Ava](https://wiki/ava).".into();
        q.failure_conditions = Some(vec!["Don't [run](javascript:x).".into()]);
        q.rewards = Some(vec![Reward {
            id: 1,
            name: "Gem".into(),
            amount: 3,
            link: "https://x".into(),
        }]);
        q.steps[0].details = Some("See [the map](https://wiki/map).".into());
        let el = QuestView::new(&q, false).render(&q, &store());

        let quest_links: Vec<(String, String)> =
            el.links().into_iter().map(|l| (l.label, l.url)).collect();
        assert_eq!(
            quest_links,
            vec![
                ("https://wiki/lost-ring".to_string(), "https://wiki/lost-ring".to_string()),
                ("Ava".to_string(), "https://wiki/ava".to_string()),
                ("Gem".to_string(), "https://x".to_string()),
            ]
        );

        let step_links = el.find(DisclosureKey::Step(1, 1)).unwrap().links();
        assert_eq!(step_links.len(), 1);
        assert_eq!(step_links[0].url, "https://wiki/map");
        assert!(el.find(DisclosureKey::Step(1, 2)).unwrap().links().is_empty());
    }
}
