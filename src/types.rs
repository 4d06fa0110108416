use crate::backend::types::TimelineAction;
use crate::config::ColumnAction;
use crossterm::event::{KeyEvent, MouseEvent};

pub type IdType = u32;

#[derive(Debug, Clone)]
pub enum Action {
    Error(String),
    Quit,
    Tick(usize),
    Render,
    NextFocus,
    PrevFocus,
    Column((IdType, ColumnAction)),
    /// The timeline watched by a column has changed.
    Updated(IdType),
    /// Dispatched to the store.
    Timeline(TimelineAction),
    /// The pinned columns have changed.
    ColumnsChanged,
}

#[derive(Debug, Clone)]
pub enum Event {
    Tick(usize),
    Render,
    Key(KeyEvent),
    Mouse(MouseEvent),
    Error(String),
}
