use super::column::ColumnComponent;
use super::Component;
use crate::backend::types::{ColumnKind, ColumnParams, Identity};
use crate::backend::Store;
use crate::config::{ColumnAction, Key};
use crate::types::{Action, IdType};
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::layout::{Alignment, Constraint, Layout, Rect, Size};
use ratatui::widgets::{Block, BorderType};
use ratatui::Frame;
use std::collections::HashMap;
use std::mem;
use tokio::sync::mpsc::UnboundedSender;

/// Minimum width of a column when the number of columns is derived from the terminal.
const COLUMN_WIDTH: u16 = 80;

pub struct MainComponent {
    columns: Vec<ColumnComponent>,
    focus: usize,
    num_columns: Option<usize>,
    keybindings: HashMap<Key, ColumnAction>,
    identity: Identity,
    action_tx: UnboundedSender<Action>,
    size: Size,
    /// Selected positions of unpinned columns that have been unmounted.
    scroll_positions: HashMap<String, usize>,
}

impl MainComponent {
    pub fn new(
        num_columns: Option<usize>,
        keybindings: HashMap<Key, ColumnAction>,
        identity: Identity,
        action_tx: UnboundedSender<Action>,
    ) -> Self {
        Self {
            columns: Vec::new(),
            focus: 0,
            num_columns,
            keybindings,
            identity,
            action_tx,
            size: Size::default(),
            scroll_positions: HashMap::new(),
        }
    }
    pub fn columns(&self) -> &[ColumnComponent] {
        &self.columns
    }
    pub fn focused(&self) -> Option<IdType> {
        self.columns.get(self.focus).map(|column| column.id)
    }
    /// Reconciles the mounted columns with the store's pinned columns.
    ///
    /// Columns are matched by pinned id, so a moved column keeps its state.
    pub fn sync(&mut self, store: &mut Store) -> Result<()> {
        let mut wanted = store
            .columns()
            .iter()
            .map(|settings| {
                (
                    Some(settings.id.clone()),
                    settings.kind,
                    Some(settings.params.clone()),
                )
            })
            .collect::<Vec<_>>();
        if !wanted.iter().any(|(_, kind, _)| *kind == ColumnKind::Home) {
            wanted.push((None, ColumnKind::Home, None));
        }
        let focused = self.focused();
        let mut mounted = mem::take(&mut self.columns);
        for (column_id, kind, params) in wanted {
            let column = match mounted.iter().position(|column| {
                column.column_id() == column_id.as_deref() && column.kind() == kind
            }) {
                Some(index) => {
                    let mut column = mounted.remove(index);
                    if let Some(params) = params {
                        column.set_params(params);
                    }
                    column
                }
                None => self.mount(column_id, kind, params.unwrap_or_default(), store)?,
            };
            self.columns.push(column);
        }
        for column in mounted {
            self.unmount(column);
        }
        self.focus = self
            .columns
            .iter()
            .position(|column| Some(column.id) == focused)
            .unwrap_or(self.focus.min(self.columns.len().saturating_sub(1)));
        Ok(())
    }
    fn mount(
        &self,
        column_id: Option<String>,
        kind: ColumnKind,
        params: ColumnParams,
        store: &mut Store,
    ) -> Result<ColumnComponent> {
        log::debug!("mount {kind} column {column_id:?}");
        let mut column = ColumnComponent::new(
            column_id,
            kind,
            params,
            store.timeline(kind.timeline()),
            self.identity.clone(),
            self.action_tx.clone(),
        );
        if let Some(position) = self.scroll_positions.get(column.list().scroll_key()) {
            column.list_mut().restore_position(*position);
        }
        column.init(self.size)?;
        Ok(column)
    }
    fn unmount(&mut self, mut column: ColumnComponent) {
        log::debug!("unmount {} column {:?}", column.kind(), column.column_id());
        if !column.pinned() {
            if let Some(position) = column.list().position() {
                self.scroll_positions
                    .insert(column.list().scroll_key().to_string(), position);
            }
        }
        column.dispose();
    }
    fn visible(&self, width: u16) -> (usize, usize) {
        let auto = usize::from(width / COLUMN_WIDTH).max(1);
        let num = self
            .num_columns
            .map_or(auto, |n| n.min(auto))
            .clamp(1, self.columns.len().max(1));
        let start = (self.focus + 1).saturating_sub(num);
        (start, num)
    }
}

impl Component for MainComponent {
    fn init(&mut self, size: Size) -> Result<()> {
        self.size = size;
        Ok(())
    }
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let Some(id) = self.focused() else {
            return Ok(None);
        };
        Ok(self
            .keybindings
            .get(&Key::from(key))
            .map(|action| Action::Column((id, *action))))
    }
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        let len = self.columns.len();
        match action {
            Action::NextFocus if len > 0 => {
                self.focus = (self.focus + 1) % len;
                Ok(Some(Action::Render))
            }
            Action::PrevFocus if len > 0 => {
                self.focus = (self.focus + len - 1) % len;
                Ok(Some(Action::Render))
            }
            action => {
                for column in self.columns.iter_mut() {
                    if let Some(action) = column.update(action.clone())? {
                        return Ok(Some(action));
                    }
                }
                Ok(None)
            }
        }
    }
    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        let (start, num) = self.visible(area.width);
        let layout = Layout::horizontal((0..num).map(|_| Constraint::Fill(1))).split(area);
        for (i, (area, column)) in layout
            .iter()
            .zip(self.columns.iter_mut().skip(start))
            .enumerate()
        {
            let mut block = Block::bordered()
                .title(column.title())
                .title_alignment(Alignment::Center);
            if start + i == self.focus {
                block = block.border_type(BorderType::Double);
            }
            column.draw(f, block.inner(*area))?;
            f.render_widget(block, *area);
        }
        Ok(())
    }
}
