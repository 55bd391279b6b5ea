//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which owns the quest content, the
//! page of quest disclosures and the completion store, handles user input and
//! renders the interface.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing::warn;

use crate::config::Config;
use crate::markdown::Link;
use crate::opener::open_link;
use crate::quest::{QuestBook, QuestId};
use crate::store::{CompletionRecord, CompletionStore, KeyValueStore};
use crate::tui::{
    colors::{DARK_PURPLE, DARK_RED, GOLD},
    enums::{AppState, StatusTone},
    render::layout,
    utils::centered_rect,
};
use crate::view::{DisclosureKey, QuestList};

/// Main application state for the terminal user interface.
///
/// Open/closed state lives in `list`; completion state lives in `store`.
pub struct App<S> {
    state: AppState,
    book: QuestBook,
    list: QuestList,
    store: CompletionStore<S>,
    selected: usize,
    scroll: u16,
    show_completed: bool,
    status_message: String,
    status_tone: StatusTone,
    links: Vec<Link>,
    link_selected: usize,
    opener: String,
    profile_name: String,
}

impl<S> App<S>
where
    S: KeyValueStore<QuestId, CompletionRecord>,
{
    /// Create a new App over loaded content and an opened store.
    pub fn new(book: QuestBook, store: CompletionStore<S>, config: &Config, profile_name: &str) -> Self {
        let list = QuestList::new(&book, config.open_by_default);
        App {
            state: AppState::QuestList,
            book,
            list,
            store,
            selected: 0,
            scroll: 0,
            show_completed: true,
            status_message: String::new(),
            status_tone: StatusTone::Info,
            links: Vec::new(),
            link_selected: 0,
            opener: config.opener(),
            profile_name: profile_name.to_string(),
        }
    }

    fn visible_keys(&self) -> Vec<DisclosureKey> {
        let store = &self.store;
        let show_completed = self.show_completed;
        self.list
            .visible_keys(|id| show_completed || !store.is_complete(id))
    }

    fn selected_key(&self) -> Option<DisclosureKey> {
        self.visible_keys().get(self.selected).copied()
    }

    /// Keep `key` selected if it is still visible, otherwise clamp the index.
    fn reselect(&mut self, key: DisclosureKey) {
        let keys = self.visible_keys();
        if let Some(pos) = keys.iter().position(|k| *k == key) {
            self.selected = pos;
        } else {
            self.selected = self.selected.min(keys.len().saturating_sub(1));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.visible_keys().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
        self.status_tone = StatusTone::Info;
    }

    fn set_warning(&mut self, msg: String) {
        self.status_message = msg;
        self.status_tone = StatusTone::Warning;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
        self.status_tone = StatusTone::Info;
    }

    fn name_of(&self, key: DisclosureKey) -> String {
        let Some(quest) = self.book.get(key.quest()) else {
            return String::new();
        };
        match key {
            DisclosureKey::Quest(_) => quest.name.clone(),
            DisclosureKey::Step(_, step) => quest
                .steps
                .iter()
                .find(|s| s.id == step)
                .map(|s| s.title.clone())
                .unwrap_or_default(),
        }
    }

    /// Expand or collapse the selected disclosure.
    fn toggle_selected(&mut self) {
        if let Some(key) = self.selected_key() {
            self.list.toggle(key);
            self.reselect(key);
        }
    }

    /// Flip the checkbox of the selected quest or step.
    fn check_selected(&mut self) {
        let Some(key) = self.selected_key() else {
            return;
        };

        let result = match key {
            DisclosureKey::Quest(q) => self
                .list
                .view(q)
                .map(|view| view.click_checkbox(&mut self.store)),
            DisclosureKey::Step(q, s) => self
                .list
                .view(q)
                .and_then(|view| view.step(s))
                .map(|step| step.click_checkbox(&mut self.store)),
        };

        let name = self.name_of(key);
        match result {
            Some(Ok(true)) => self.set_status_message(format!("Marked '{name}' done")),
            Some(Ok(false)) => self.set_status_message(format!("Reopened '{name}'")),
            Some(Err(e)) => {
                warn!(?key, error = %e, "completion toggle not persisted");
                self.set_warning(format!("Progress not saved: {e}"));
            }
            None => {}
        }
        self.reselect(key);
    }

    fn open_url(&mut self, url: &str) {
        match open_link(&self.opener, url) {
            Ok(()) => self.set_status_message(format!("Opened {url}")),
            Err(e) => {
                warn!(url, error = %e, "failed to open link");
                self.set_warning(e.to_string());
            }
        }
    }

    /// Open the selected quest's external link.
    fn open_selected_link(&mut self) {
        let Some(key) = self.selected_key() else {
            return;
        };
        let Some(link) = self.book.get(key.quest()).map(|q| q.link.clone()) else {
            return;
        };
        self.open_url(&link);
    }

    /// Links shown inside the selected disclosure: the quest page, markdown
    /// links and reward links for a quest; detail links for a step.
    fn selected_links(&self) -> Vec<Link> {
        let Some(key) = self.selected_key() else {
            return Vec::new();
        };
        let (Some(quest), Some(view)) = (self.book.get(key.quest()), self.list.view(key.quest())) else {
            return Vec::new();
        };
        view.render(quest, &self.store)
            .find(key)
            .map(|element| element.links())
            .unwrap_or_default()
    }

    /// Open the link picker for the selected disclosure.
    fn show_links(&mut self) {
        let links = self.selected_links();
        if links.is_empty() {
            let name = self.selected_key().map(|k| self.name_of(k)).unwrap_or_default();
            self.set_status_message(format!("No links in '{name}'"));
            return;
        }
        self.links = links;
        self.link_selected = 0;
        self.state = AppState::Links;
    }

    fn close_links(&mut self) {
        self.links.clear();
        self.link_selected = 0;
        self.state = AppState::QuestList;
    }

    fn open_picked_link(&mut self, index: usize) {
        let Some(url) = self.links.get(index).map(|l| l.url.clone()) else {
            return;
        };
        self.close_links();
        self.open_url(&url);
    }

    fn handle_link_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('l') => self.close_links(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.link_selected = self.link_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.link_selected = (self.link_selected + 1).min(self.links.len().saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char('o') => self.open_picked_link(self.link_selected),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.open_picked_link(index);
            }
            _ => {}
        }
    }

    fn set_all_open(&mut self, open: bool) {
        let key = self.selected_key();
        self.list.set_all_open(open);
        match key {
            Some(DisclosureKey::Step(q, _)) if !open => self.reselect(DisclosureKey::Quest(q)),
            Some(key) => self.reselect(key),
            None => {}
        }
    }

    fn toggle_show_completed(&mut self) {
        let key = self.selected_key();
        self.show_completed = !self.show_completed;
        if let Some(key) = key {
            self.reselect(key);
        }
        self.set_status_message(if self.show_completed {
            "Showing completed quests".to_string()
        } else {
            "Hiding completed quests".to_string()
        });
    }

    /// Handle one key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.state == AppState::Help {
            self.state = AppState::QuestList;
            return false;
        }

        self.clear_status_message();
        if self.state == AppState::Links {
            self.handle_link_key(key);
            return false;
        }

        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.move_selection(isize::MAX),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('x') => self.check_selected(),
            KeyCode::Char('o') => self.open_selected_link(),
            KeyCode::Char('l') => self.show_links(),
            KeyCode::Char('E') => self.set_all_open(true),
            KeyCode::Char('C') => self.set_all_open(false),
            KeyCode::Char('t') => self.toggle_show_completed(),
            KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    fn progress(&self) -> (usize, usize) {
        let done = self
            .book
            .quests
            .iter()
            .filter(|q| self.store.is_complete(q.id))
            .count();
        (done, self.book.quests.len())
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let (done, total) = self.progress();
        let header_text = vec![Line::from(vec![
            Span::styled("SIDE QUESTS", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Profile: {}  Completed: {done}/{total}", self.profile_name),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];

        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    /// Render the page of quest disclosures, scrolled to keep the selection visible.
    fn render_quests(&mut self, f: &mut Frame, area: Rect) {
        let store = &self.store;
        let show_completed = self.show_completed;
        let elements = self
            .list
            .render(&self.book, store, |id| show_completed || !store.is_complete(id));
        let mut page = layout(&elements);

        let selected_line = self.selected_key().and_then(|key| page.anchor(key));
        if let Some(line) = selected_line {
            page.lines[line].style = Style::default().bg(Color::Gray).fg(Color::Black);

            let height = area.height.saturating_sub(2) as usize;
            let scroll = self.scroll as usize;
            if line < scroll {
                self.scroll = line as u16;
            } else if height > 0 && line >= scroll + height {
                self.scroll = (line + 1 - height) as u16;
            }
        }

        if page.lines.is_empty() {
            page.lines.push(Line::from(Span::styled(
                "No quests to show. Press 't' to show completed quests.",
                Style::default().fg(Color::DarkGray),
            )));
        }

        let body = Paragraph::new(page.lines)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Quests ({}) - Press 'h' for help",
                elements.len()
            )))
            .scroll((self.scroll, 0));
        f.render_widget(body, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from(vec![Span::styled(
                "Side Quest Help",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("  ↑/k, ↓/j     Move between quests and steps"),
            Line::from("  g/G          Jump to first/last"),
            Line::from("  Enter/Space  Expand or collapse selection"),
            Line::from("  x            Toggle completion checkbox"),
            Line::from("  o            Open the quest's external link"),
            Line::from("  l            Pick any link in the selection"),
            Line::from("  E / C        Expand / collapse all quests"),
            Line::from("  t            Show/hide completed quests"),
            Line::from("  h/?/F1       Show this help"),
            Line::from("  q/Esc/Ctrl+C Quit"),
        ];

        let popup = centered_rect(70, 90, area);
        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help - Press any key to return"),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, popup);
        f.render_widget(paragraph, popup);
    }

    fn render_links(&self, f: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let number = if i < 9 { format!("{}. ", i + 1) } else { "   ".to_string() };
                let mut line = Line::from(vec![
                    Span::raw(number),
                    Span::styled(link.label.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", link.url), Style::default().fg(Color::DarkGray)),
                ]);
                if i == self.link_selected {
                    line.style = Style::default().bg(Color::Gray).fg(Color::Black);
                }
                line
            })
            .collect();

        let popup = centered_rect(80, 60, area);
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Links - Enter/1-9 to open, Esc to close"),
        );

        f.render_widget(Clear, popup);
        f.render_widget(paragraph, popup);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let hidden = if self.show_completed { "" } else { " | completed hidden" };
            format!(
                "Visible entries: {}{hidden} | Press 'h' for help",
                self.visible_keys().len()
            )
        };

        let (bg, fg) = match self.status_tone {
            StatusTone::Info => (DARK_PURPLE, Color::White),
            StatusTone::Warning => (DARK_RED, GOLD),
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(bg).fg(fg))
            .alignment(Alignment::Left);

        f.render_widget(status, area);
    }

    /// Main render function.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_quests(f, chunks[1]);
        match self.state {
            AppState::Help => self.render_help(f, chunks[1]),
            AppState::Links => self.render_links(f, chunks[1]),
            AppState::QuestList => {}
        }
        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop for the TUI application.
    ///
    /// Handles rendering and input processing until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
