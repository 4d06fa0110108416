use crate::backend::types::{FeedSnapshot, Post, PostId, Shows};
use crate::widgets::post_text;
use ratatui::layout::Rect;
use ratatui::style::{Style, Stylize};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, List, ListState, Padding};
use ratatui::Frame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// The last post became visible; more posts older than it are wanted.
    LoadMore(PostId),
    /// Whether the list is scrolled to the top.
    Top(bool),
}

enum Row {
    Post(Box<Post>),
    Gap,
}

enum Anchor {
    Post(PostId),
    Index(usize),
}

pub struct StatusListComponent {
    scroll_key: String,
    empty_message: &'static str,
    prepend: Vec<Text<'static>>,
    rows: Vec<Row>,
    state: ListState,
    top: bool,
}

impl StatusListComponent {
    pub fn new(scroll_key: String, empty_message: &'static str) -> Self {
        Self {
            scroll_key,
            empty_message,
            prepend: Vec::new(),
            rows: Vec::new(),
            state: ListState::default(),
            top: true,
        }
    }
    pub fn scroll_key(&self) -> &str {
        &self.scroll_key
    }
    fn len(&self) -> usize {
        self.prepend.len() + self.rows.len()
    }
    fn anchor(&self) -> Option<Anchor> {
        let selected = self.state.selected()?;
        match selected
            .checked_sub(self.prepend.len())
            .and_then(|i| self.rows.get(i))
        {
            Some(Row::Post(post)) => Some(Anchor::Post(post.id.clone())),
            _ => Some(Anchor::Index(selected)),
        }
    }
    /// Replaces the contents, keeping the selected post selected.
    ///
    /// Posts that `shows` filters out are skipped. If the selected post is
    /// gone, the selection falls back to the top.
    pub fn set_contents(
        &mut self,
        prepend: Vec<Text<'static>>,
        snapshot: &FeedSnapshot,
        shows: Shows,
    ) -> Vec<ListEvent> {
        let anchor = self.anchor();
        self.prepend = prepend;
        self.rows = snapshot
            .items
            .iter()
            .filter_map(|item| match item {
                Some(id) => snapshot
                    .statuses
                    .get(id)
                    .filter(|post| shows.allows(post))
                    .map(|post| Row::Post(Box::new(post.clone()))),
                None => Some(Row::Gap),
            })
            .collect();
        let selected = match anchor {
            Some(_) if self.len() == 0 => None,
            Some(Anchor::Index(0)) => Some(0),
            Some(Anchor::Post(id)) => self
                .rows
                .iter()
                .position(|row| matches!(row, Row::Post(post) if post.id == id))
                .map(|i| i + self.prepend.len())
                .or(Some(0)),
            Some(Anchor::Index(i)) => Some(i.min(self.len() - 1)),
            None => None,
        };
        self.state.select(selected);
        if selected.unwrap_or_default() == 0 && !self.top {
            self.top = true;
            return vec![ListEvent::Top(true)];
        }
        Vec::new()
    }
    fn moved(&mut self) -> Vec<ListEvent> {
        let mut events = Vec::new();
        let selected = self.state.selected().unwrap_or_default();
        let top = selected == 0;
        if top != self.top {
            self.top = top;
            events.push(ListEvent::Top(top));
        }
        if selected + 1 == self.len() {
            if let Some(Row::Post(post)) = self.rows.last() {
                events.push(ListEvent::LoadMore(post.id.clone()));
            }
        }
        events
    }
    pub fn next(&mut self) -> Vec<ListEvent> {
        if self.len() == 0 {
            return Vec::new();
        }
        self.state.select(Some(
            self.state
                .selected()
                .map(|s| (s + 1).min(self.len() - 1))
                .unwrap_or_default(),
        ));
        self.moved()
    }
    pub fn prev(&mut self) -> Vec<ListEvent> {
        if self.len() == 0 {
            return Vec::new();
        }
        self.state.select(Some(
            self.state
                .selected()
                .map(|s| s.max(1) - 1)
                .unwrap_or_default(),
        ));
        self.moved()
    }
    pub fn scroll_to_top(&mut self) -> Vec<ListEvent> {
        *self.state.offset_mut() = 0;
        if self.len() > 0 {
            self.state.select(Some(0));
        }
        if self.top {
            Vec::new()
        } else {
            self.top = true;
            vec![ListEvent::Top(true)]
        }
    }
    pub fn position(&self) -> Option<usize> {
        self.state.selected()
    }
    pub fn restore_position(&mut self, position: usize) {
        self.state.select(Some(position));
        self.top = position == 0;
    }
    pub fn draw(&mut self, f: &mut Frame<'_>, area: Rect) {
        let width = area.width.saturating_sub(2);
        let mut items = self.prepend.clone();
        items.extend(self.rows.iter().map(|row| match row {
            Row::Post(post) => post_text(post, width),
            Row::Gap => Text::from(Line::from("  ···").dim()),
        }));
        if self.rows.is_empty() {
            items.push(Text::from(self.empty_message).dim());
        }
        f.render_stateful_widget(
            List::new(items)
                .highlight_style(Style::default().reset().reversed())
                .block(Block::default().padding(Padding::horizontal(1))),
            area,
            &mut self.state,
        );
    }
}
