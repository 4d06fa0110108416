use crate::backend::config::TimelineConfig;
use crate::types::Action as AppAction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub keybindings: Keybindings,
    pub num_columns: Option<usize>,
    /// Path to the saved session of the agent.
    pub session: Option<PathBuf>,
    #[serde(default)]
    pub timeline: TimelineConfig,
}

impl Config {
    /// Binds the default keys that the configuration leaves unbound.
    pub fn set_default_keybindings(&mut self) {
        for (key, action) in [
            ("Ctrl-c", GlobalAction::Quit),
            ("Ctrl-q", GlobalAction::Quit),
            ("Tab", GlobalAction::NextFocus),
            ("BackTab", GlobalAction::PrevFocus),
        ] {
            if let Some(key) = Key::parse(key) {
                self.keybindings.global.entry(key).or_insert(action);
            }
        }
        for (key, action) in [
            ("j", ColumnAction::NextItem),
            ("Down", ColumnAction::NextItem),
            ("k", ColumnAction::PrevItem),
            ("Up", ColumnAction::PrevItem),
            ("g", ColumnAction::Top),
            ("p", ColumnAction::Pin),
            ("<", ColumnAction::MoveLeft),
            (">", ColumnAction::MoveRight),
            ("b", ColumnAction::ToggleReposts),
            ("r", ColumnAction::ToggleReplies),
        ] {
            if let Some(key) = Key::parse(key) {
                self.keybindings.column.entry(key).or_insert(action);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Keybindings {
    #[serde(default)]
    pub global: HashMap<Key, GlobalAction>,
    #[serde(default)]
    pub column: HashMap<Key, ColumnAction>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Key(KeyCode, Option<KeyModifiers>);

const NAMED_KEYS: [(&str, KeyCode); 10] = [
    ("Up", KeyCode::Up),
    ("Down", KeyCode::Down),
    ("Left", KeyCode::Left),
    ("Right", KeyCode::Right),
    ("Home", KeyCode::Home),
    ("End", KeyCode::End),
    ("Enter", KeyCode::Enter),
    ("Esc", KeyCode::Esc),
    ("Tab", KeyCode::Tab),
    ("BackTab", KeyCode::BackTab),
];

impl Key {
    fn parse(s: &str) -> Option<Self> {
        if let Some(code) = single_char(s) {
            return Some(Self(KeyCode::Char(code), None));
        }
        let (modifier, code) = match s.split_once('-') {
            Some(("Ctrl", code)) => (Some(KeyModifiers::CONTROL), code),
            Some(("Shift", code)) => (Some(KeyModifiers::SHIFT), code),
            Some(_) => return None,
            None => (None, s),
        };
        let code = if let Some(c) = single_char(code) {
            KeyCode::Char(c)
        } else {
            NAMED_KEYS
                .iter()
                .find_map(|(name, key)| (*name == code).then_some(*key))?
        };
        Some(Self(code, modifier))
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        Self(
            event.code,
            match (event.code, event.modifiers) {
                // The code already carries the shift state.
                (KeyCode::Char(_) | KeyCode::BackTab, KeyModifiers::SHIFT) => None,
                (_, KeyModifiers::CONTROL | KeyModifiers::SHIFT) => Some(event.modifiers),
                _ => None,
            },
        )
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let code = match self.0 {
            KeyCode::Char(c) => c.to_string(),
            code => NAMED_KEYS
                .iter()
                .find_map(|(name, key)| (*key == code).then(|| name.to_string()))
                .ok_or_else(|| <S::Error as serde::ser::Error>::custom("invalid key code"))?,
        };
        match self.1 {
            Some(KeyModifiers::CONTROL) => format!("Ctrl-{code}").serialize(serializer),
            Some(KeyModifiers::SHIFT) => format!("Shift-{code}").serialize(serializer),
            Some(_) => Err(serde::ser::Error::custom("invalid key modifier")),
            None => code.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid key: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GlobalAction {
    NextFocus,
    PrevFocus,
    Quit,
}

impl From<&GlobalAction> for AppAction {
    fn from(action: &GlobalAction) -> Self {
        match action {
            GlobalAction::NextFocus => AppAction::NextFocus,
            GlobalAction::PrevFocus => AppAction::PrevFocus,
            GlobalAction::Quit => AppAction::Quit,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnAction {
    NextItem,
    PrevItem,
    Top,
    Pin,
    MoveLeft,
    MoveRight,
    ToggleReposts,
    ToggleReplies,
}
