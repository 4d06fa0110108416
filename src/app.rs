use crate::backend::types::{ColumnKind, Identity, TimelineAction};
use crate::backend::Store;
use crate::components::main::MainComponent;
use crate::components::Component;
use crate::config::{Config, Key};
use crate::tui::{io, Tui};
use crate::types::{Action, Event};
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedSender};

pub struct App {
    config: Config,
    store: Store,
    identity: Identity,
    /// Where the pinned columns are persisted.
    columns_path: PathBuf,
}

impl App {
    pub fn new(config: Config, store: Store, identity: Identity, columns_path: PathBuf) -> Self {
        log::debug!("App::new({config:?})");
        Self {
            config,
            store,
            identity,
            columns_path,
        }
    }
    pub async fn run(&mut self) -> Result<()> {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();

        let terminal = Terminal::new(CrosstermBackend::new(io()))?;
        log::debug!("terminal size: {}", terminal.size()?);
        let mut tui = Tui::new(terminal);
        tui.start()?;

        let mut main_component = MainComponent::new(
            self.config.num_columns,
            self.config.keybindings.column.clone(),
            self.identity.clone(),
            action_tx.clone(),
        );
        main_component.init(tui.size()?)?;
        main_component.sync(&mut self.store)?;

        if self.identity.signed_in() {
            action_tx.send(Action::Timeline(TimelineAction::ExpandTimeline {
                name: ColumnKind::Home.timeline().to_string(),
                max_id: None,
            }))?;
        }

        loop {
            tokio::select! {
                Some(e) = tui.next_event() => {
                    if let Some(action) = self.handle_events(e.clone()) {
                        action_tx.send(action)?;
                    }
                    if let Some(action) = main_component.handle_events(Some(e))? {
                        action_tx.send(action)?;
                    }
                }
                Some(action) = action_rx.recv() => {
                    if !matches!(action, Action::Tick(_) | Action::Render) {
                        log::debug!("Action {action:?}");
                    }
                    match action {
                        Action::Quit => break,
                        Action::Tick(_) => {}
                        Action::Error(e) => log::error!("{e}"),
                        Action::Timeline(action) => self.dispatch(action, &action_tx)?,
                        Action::ColumnsChanged => {
                            main_component.sync(&mut self.store)?;
                            action_tx.send(Action::Render)?;
                        }
                        Action::Render => {
                            tui.draw(|f| {
                                if let Err(e) = main_component.draw(f, f.area()) {
                                    if let Err(e) = action_tx
                                        .send(Action::Error(format!("failed to draw: {e:?}")))
                                    {
                                        log::error!("failed to send error: {e}");
                                    }
                                }
                            })?;
                        }
                        action => {
                            if let Some(action) = main_component.update(action)? {
                                action_tx.send(action)?;
                            }
                        }
                    }
                }
            }
        }
        tui.end()?;
        Ok(())
    }
    fn dispatch(
        &mut self,
        action: TimelineAction,
        action_tx: &UnboundedSender<Action>,
    ) -> Result<()> {
        if self.store.apply(action) {
            if let Err(e) = self.store.save_columns(&self.columns_path) {
                log::error!("failed to save columns: {e}");
            }
            action_tx.send(Action::ColumnsChanged)?;
        }
        Ok(())
    }
    fn handle_events(&mut self, event: Event) -> Option<Action> {
        match event {
            Event::Tick(i) => Some(Action::Tick(i)),
            Event::Render => Some(Action::Render),
            Event::Key(key_event) => self.handle_key_events(key_event),
            Event::Error(e) => Some(Action::Error(e)),
            Event::Mouse(_) => None,
        }
    }
    fn handle_key_events(&mut self, key_event: KeyEvent) -> Option<Action> {
        self.config
            .keybindings
            .global
            .get(&Key::from(key_event))
            .map(Action::from)
    }
}
