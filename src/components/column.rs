use super::status_list::{ListEvent, StatusListComponent};
use super::Component;
use crate::backend::speed::SpeedSelector;
use crate::backend::types::{
    ColumnKind, ColumnParams, FeedSnapshot, Identity, PostId, Shows, TimelineAction,
};
use crate::config::ColumnAction;
use crate::types::{Action, IdType};
use crate::widgets::{ExplorePrompt, NotSignedIn};
use chrono::Utc;
use color_eyre::Result;
use ratatui::layout::{Rect, Size};
use ratatui::style::Stylize;
use ratatui::text::{Line, Span, Text};
use ratatui::Frame;
use std::mem;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Delay between refreshes while the timeline is partial.
const POLL_INTERVAL: Duration = Duration::from_millis(3000);

const EMPTY_MESSAGE: &str = "Your home timeline is empty! Follow more people to fill it up.";

/// A single timeline column.
///
/// Polling is edge-triggered: it starts when the timeline is observed to
/// become partial and stops when it is observed to recover or the column is
/// disposed. A column mounted on an already partial timeline does not poll
/// until the flag toggles.
pub struct ColumnComponent {
    pub id: IdType,
    column_id: Option<String>,
    kind: ColumnKind,
    params: ColumnParams,
    timeline: watch::Receiver<FeedSnapshot>,
    is_partial: bool,
    identity: Identity,
    list: StatusListComponent,
    speed: SpeedSelector,
    action_tx: UnboundedSender<Action>,
    polling: Option<JoinHandle<()>>,
    watching: Option<JoinHandle<()>>,
}

impl ColumnComponent {
    pub fn new(
        column_id: Option<String>,
        kind: ColumnKind,
        params: ColumnParams,
        timeline: watch::Receiver<FeedSnapshot>,
        identity: Identity,
        action_tx: UnboundedSender<Action>,
    ) -> Self {
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let is_partial = timeline.borrow().is_partial;
        let scroll_key = format!(
            "{}_timeline-{}",
            kind.timeline(),
            column_id.as_deref().unwrap_or_default()
        );
        Self {
            id,
            column_id,
            kind,
            params,
            timeline,
            is_partial,
            identity,
            list: StatusListComponent::new(scroll_key, EMPTY_MESSAGE),
            speed: SpeedSelector::default(),
            action_tx,
            polling: None,
            watching: None,
        }
    }
    pub fn column_id(&self) -> Option<&str> {
        self.column_id.as_deref()
    }
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }
    pub fn pinned(&self) -> bool {
        self.column_id.is_some()
    }
    pub fn shows(&self) -> Shows {
        Shows::from_params(&self.params)
    }
    /// Takes the params of the pinned column this component displays.
    pub fn set_params(&mut self, params: ColumnParams) {
        self.params = params;
    }
    pub fn list(&self) -> &StatusListComponent {
        &self.list
    }
    pub fn list_mut(&mut self) -> &mut StatusListComponent {
        &mut self.list
    }
    pub fn title(&self) -> Line<'static> {
        let mut spans = vec![Span::from(format!(" {} ", self.kind)).bold()];
        if self.timeline.borrow().has_unread() {
            spans.push(Span::from("● ").blue());
        }
        let shows = self.shows();
        if !shows.reposts {
            spans.push(Span::from("-reposts ").dim());
        }
        if !shows.replies {
            spans.push(Span::from("-replies ").dim());
        }
        if self.pinned() {
            spans.push(Span::from("📌 "));
        }
        Line::from(spans)
    }
    fn dispatch(&self, action: TimelineAction) {
        if let Err(e) = self.action_tx.send(Action::Timeline(action)) {
            log::error!("failed to dispatch timeline action: {e}");
        }
    }
    /// Pins the column, or unpins it if it is already pinned.
    pub fn pin(&self) {
        match &self.column_id {
            Some(id) => self.dispatch(TimelineAction::RemoveColumn(id.clone())),
            None => self.dispatch(TimelineAction::AddColumn(self.kind, self.params.clone())),
        }
    }
    /// Flips whether posts of one kind (`Shows::REPOSTS`, `Shows::REPLIES`) are shown.
    ///
    /// A pinned column persists the change through the store, a transient
    /// one keeps it until it is unmounted.
    pub fn toggle_setting(&mut self, key: &str) {
        let shown = self
            .params
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);
        let value = serde_json::Value::Bool(!shown);
        match &self.column_id {
            Some(id) => self.dispatch(TimelineAction::ChangeColumnParams(
                id.clone(),
                key.to_string(),
                value,
            )),
            None => {
                self.params.insert(key.to_string(), value);
            }
        }
    }
    /// Moves the column left (negative) or right (positive).
    pub fn move_column(&self, direction: isize) {
        if let Some(id) = &self.column_id {
            self.dispatch(TimelineAction::MoveColumn(id.clone(), direction));
        }
    }
    pub fn header_click(&mut self) {
        let events = self.list.scroll_to_top();
        self.handle_list_events(events);
    }
    pub fn load_more(&self, max_id: Option<PostId>) {
        self.dispatch(TimelineAction::ExpandTimeline {
            name: self.kind.timeline().to_string(),
            max_id,
        });
    }
    fn handle_list_events(&self, events: Vec<ListEvent>) {
        for event in events {
            match event {
                ListEvent::LoadMore(max_id) => self.load_more(Some(max_id)),
                ListEvent::Top(top) => self.dispatch(TimelineAction::ScrollTop(
                    self.kind.timeline().to_string(),
                    top,
                )),
            }
        }
    }
    pub fn on_state_transition(&mut self, was_partial: bool, is_partial: bool) {
        match (was_partial, is_partial) {
            (false, true) => self.start_polling(),
            (true, false) => self.stop_polling(),
            _ => {}
        }
    }
    pub fn is_polling(&self) -> bool {
        self.polling.is_some()
    }
    fn start_polling(&mut self) {
        if self.polling.is_some() {
            return;
        }
        let (tx, name) = (self.action_tx.clone(), self.kind.timeline().to_string());
        log::debug!("start polling {name}");
        self.polling = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = tx.send(Action::Timeline(TimelineAction::ExpandTimeline {
                    name: name.clone(),
                    max_id: None,
                })) {
                    break log::warn!("failed to send expand action: {e}");
                }
            }
        }));
    }
    fn stop_polling(&mut self) {
        if let Some(handle) = self.polling.take() {
            log::debug!("stop polling {}", self.kind.timeline());
            handle.abort();
        }
    }
    /// Re-reads the timeline and reacts to a change of its partial flag.
    fn refresh(&mut self) {
        let is_partial = self.timeline.borrow().is_partial;
        let was_partial = mem::replace(&mut self.is_partial, is_partial);
        self.on_state_transition(was_partial, is_partial);
    }
    pub fn dispose(&mut self) {
        self.stop_polling();
        if let Some(handle) = self.watching.take() {
            handle.abort();
        }
    }
}

impl Drop for ColumnComponent {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Component for ColumnComponent {
    fn init(&mut self, _size: Size) -> Result<()> {
        let (id, tx, mut rx) = (self.id, self.action_tx.clone(), self.timeline.clone());
        self.watching = Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if let Err(e) = tx.send(Action::Updated(id)) {
                    log::error!("failed to send update action: {e}");
                    break;
                }
            }
            log::debug!("timeline watch finished");
        }));
        Ok(())
    }
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::Updated(id) if id == self.id => {
                self.refresh();
                Ok(Some(Action::Render))
            }
            Action::Column((id, action)) if id == self.id => {
                match action {
                    ColumnAction::NextItem => {
                        let events = self.list.next();
                        self.handle_list_events(events);
                    }
                    ColumnAction::PrevItem => {
                        let events = self.list.prev();
                        self.handle_list_events(events);
                    }
                    ColumnAction::Top => self.header_click(),
                    ColumnAction::Pin => self.pin(),
                    ColumnAction::MoveLeft => self.move_column(-1),
                    ColumnAction::MoveRight => self.move_column(1),
                    ColumnAction::ToggleReposts => self.toggle_setting(Shows::REPOSTS),
                    ColumnAction::ToggleReplies => self.toggle_setting(Shows::REPLIES),
                }
                Ok(Some(Action::Render))
            }
            _ => Ok(None),
        }
    }
    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        if !self.identity.signed_in() {
            f.render_widget(NotSignedIn, area);
            return Ok(());
        }
        let shows = self.shows();
        let events = {
            let snapshot = self.timeline.borrow();
            let viewer = self.identity.viewer();
            let mut banners = Vec::new();
            if self.speed.too_slow(&snapshot, viewer.as_deref(), Utc::now()) {
                banners.push(Text::from(ExplorePrompt));
            }
            self.list.set_contents(banners, &snapshot, shows)
        };
        self.handle_list_events(events);
        self.list.draw(f, area);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::{Account, Post};
    use chrono::{DateTime, TimeDelta};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Fixture {
        column: ColumnComponent,
        timeline: watch::Sender<FeedSnapshot>,
        actions: UnboundedReceiver<Action>,
    }

    fn fixture(column_id: Option<&str>, snapshot: FeedSnapshot, signed_in: bool) -> Fixture {
        let (timeline, rx) = watch::channel(snapshot);
        let (action_tx, actions) = mpsc::unbounded_channel();
        let identity = Identity::new(signed_in.then(|| Account {
            did: "did:fake:me".to_string(),
            handle: "me.test".to_string(),
        }));
        Fixture {
            column: ColumnComponent::new(
                column_id.map(String::from),
                ColumnKind::Home,
                ColumnParams::new(),
                rx,
                identity,
                action_tx,
            ),
            timeline,
            actions,
        }
    }

    impl Fixture {
        fn set_partial(&mut self, is_partial: bool) {
            self.timeline
                .send_modify(|snapshot| snapshot.is_partial = is_partial);
            let id = self.column.id;
            self.column
                .update(Action::Updated(id))
                .expect("failed to update");
        }
        fn timeline_actions(&mut self) -> Vec<TimelineAction> {
            let mut actions = Vec::new();
            while let Ok(action) = self.actions.try_recv() {
                if let Action::Timeline(action) = action {
                    actions.push(action);
                }
            }
            actions
        }
        fn render(&mut self) -> String {
            let mut terminal =
                Terminal::new(TestBackend::new(80, 20)).expect("failed to create terminal");
            terminal
                .draw(|f| {
                    self.column
                        .draw(f, f.area())
                        .expect("failed to draw column");
                })
                .expect("failed to draw");
            terminal
                .backend()
                .buffer()
                .content()
                .iter()
                .map(|cell| cell.symbol())
                .collect()
        }
    }

    fn expand_newest() -> TimelineAction {
        TimelineAction::ExpandTimeline {
            name: "home".to_string(),
            max_id: None,
        }
    }

    fn post(id: &str, created_at: DateTime<Utc>) -> Post {
        Post {
            id: id.to_string(),
            author: "did:fake:other".to_string(),
            handle: "other.test".to_string(),
            display_name: None,
            text: format!("post {id}"),
            created_at,
            reply_count: 0,
            repost_count: 0,
            like_count: 0,
            reposted_by: None,
            is_reply: false,
        }
    }

    fn recent_snapshot() -> FeedSnapshot {
        let now = Utc::now();
        let posts = [
            post("b", now - TimeDelta::minutes(1)),
            post("a", now - TimeDelta::minutes(2)),
        ];
        FeedSnapshot {
            items: posts.iter().map(|p| Some(p.id.clone())).collect(),
            statuses: posts.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn pin_unpinned_column() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture.column.pin();
        assert_eq!(
            fixture.timeline_actions(),
            [TimelineAction::AddColumn(
                ColumnKind::Home,
                ColumnParams::new()
            )]
        );
    }

    #[test]
    fn unpin_pinned_column() {
        let mut fixture = fixture(Some("3"), FeedSnapshot::default(), true);
        fixture.column.pin();
        assert_eq!(
            fixture.timeline_actions(),
            [TimelineAction::RemoveColumn("3".to_string())]
        );
    }

    #[test]
    fn move_requires_identity() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture.column.move_column(1);
        assert!(fixture.timeline_actions().is_empty());

        let mut fixture = self::fixture(Some("3"), FeedSnapshot::default(), true);
        fixture.column.move_column(-1);
        assert_eq!(
            fixture.timeline_actions(),
            [TimelineAction::MoveColumn("3".to_string(), -1)]
        );
    }

    #[test]
    fn load_more() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture.column.load_more(Some("a".to_string()));
        fixture.column.load_more(None);
        assert_eq!(
            fixture.timeline_actions(),
            [
                TimelineAction::ExpandTimeline {
                    name: "home".to_string(),
                    max_id: Some("a".to_string()),
                },
                expand_newest(),
            ]
        );
    }

    #[test]
    fn column_actions() {
        let mut fixture = fixture(Some("3"), recent_snapshot(), true);
        fixture.render();
        let id = fixture.column.id;
        for action in [
            ColumnAction::NextItem,
            ColumnAction::NextItem,
            ColumnAction::Top,
            ColumnAction::MoveRight,
            ColumnAction::Pin,
        ] {
            let result = fixture
                .column
                .update(Action::Column((id, action)))
                .expect("failed to update");
            assert!(matches!(result, Some(Action::Render)));
        }
        assert_eq!(
            fixture.timeline_actions(),
            [
                TimelineAction::ScrollTop("home".to_string(), false),
                TimelineAction::ExpandTimeline {
                    name: "home".to_string(),
                    max_id: Some("a".to_string()),
                },
                TimelineAction::ScrollTop("home".to_string(), true),
                TimelineAction::MoveColumn("3".to_string(), 1),
                TimelineAction::RemoveColumn("3".to_string()),
            ]
        );
    }

    #[test]
    fn ignores_other_columns() {
        let mut fixture = fixture(Some("3"), FeedSnapshot::default(), true);
        let other = fixture.column.id + 1;
        let result = fixture
            .column
            .update(Action::Column((other, ColumnAction::Pin)))
            .expect("failed to update");
        assert!(result.is_none());
        assert!(fixture.timeline_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_while_partial() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        assert!(!fixture.column.is_polling());

        fixture.set_partial(true);
        assert!(fixture.column.is_polling());
        time::sleep(Duration::from_millis(2900)).await;
        assert!(fixture.timeline_actions().is_empty());
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest()]);
        time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest(), expand_newest()]);

        // Unchanged flag: still exactly one timer.
        fixture.set_partial(true);
        time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest()]);

        fixture.set_partial(false);
        assert!(!fixture.column.is_polling());
        time::sleep(Duration::from_millis(10_000)).await;
        assert!(fixture.timeline_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_partial_edge_keeps_one_timer() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture.column.on_state_transition(false, true);
        time::sleep(Duration::from_millis(1000)).await;
        fixture.column.on_state_transition(false, true);
        assert!(fixture.column.is_polling());

        // First tick is still timed from the first edge.
        time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest()]);
        time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest()]);
        time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest()]);

        fixture.column.on_state_transition(true, false);
        time::sleep(Duration::from_millis(10_000)).await;
        assert!(fixture.timeline_actions().is_empty());
    }

    #[test]
    fn toggle_settings_of_transient_column() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        let id = fixture.column.id;
        fixture
            .column
            .update(Action::Column((id, ColumnAction::ToggleReposts)))
            .expect("failed to update");
        assert!(fixture.timeline_actions().is_empty());
        assert_eq!(
            fixture.column.shows(),
            Shows {
                reposts: false,
                replies: true,
            }
        );
        assert_eq!(fixture.column.title().to_string(), " Home -reposts ");

        // Pinning keeps the settings.
        fixture.column.pin();
        let mut params = ColumnParams::new();
        params.insert(Shows::REPOSTS.to_string(), serde_json::Value::Bool(false));
        assert_eq!(
            fixture.timeline_actions(),
            [TimelineAction::AddColumn(ColumnKind::Home, params)]
        );

        fixture.column.toggle_setting(Shows::REPOSTS);
        assert_eq!(fixture.column.shows(), Shows::default());
    }

    #[test]
    fn toggle_settings_of_pinned_column() {
        let mut fixture = fixture(Some("2"), FeedSnapshot::default(), true);
        let id = fixture.column.id;
        fixture
            .column
            .update(Action::Column((id, ColumnAction::ToggleReplies)))
            .expect("failed to update");
        assert_eq!(
            fixture.timeline_actions(),
            [TimelineAction::ChangeColumnParams(
                "2".to_string(),
                Shows::REPLIES.to_string(),
                serde_json::Value::Bool(false),
            )]
        );
        // Applied once the store echoes it back.
        assert_eq!(fixture.column.shows(), Shows::default());
        let mut params = ColumnParams::new();
        params.insert(Shows::REPLIES.to_string(), serde_json::Value::Bool(false));
        fixture.column.set_params(params);
        assert!(!fixture.column.shows().replies);
    }

    #[test]
    fn render_hides_reposts() {
        let mut snapshot = recent_snapshot();
        if let Some(post) = snapshot.statuses.get_mut("b") {
            post.reposted_by = Some("reposter".to_string());
        }
        let mut fixture = fixture(None, snapshot, true);
        assert!(fixture.render().contains("post b"));
        fixture.column.toggle_setting(Shows::REPOSTS);
        let screen = fixture.render();
        assert!(!screen.contains("post b"));
        assert!(screen.contains("post a"));
    }

    #[tokio::test(start_paused = true)]
    async fn mounted_partial_does_not_poll() {
        let snapshot = FeedSnapshot {
            is_partial: true,
            ..Default::default()
        };
        let mut fixture = fixture(None, snapshot, true);
        let id = fixture.column.id;
        fixture
            .column
            .update(Action::Updated(id))
            .expect("failed to update");
        assert!(!fixture.column.is_polling());
        time::sleep(Duration::from_millis(10_000)).await;
        assert!(fixture.timeline_actions().is_empty());

        // Only a new transition starts polling.
        fixture.set_partial(false);
        fixture.set_partial(true);
        assert!(fixture.column.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_polling() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture.set_partial(true);
        fixture.column.dispose();
        assert!(!fixture.column.is_polling());
        time::sleep(Duration::from_millis(10_000)).await;
        assert!(fixture.timeline_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_polling() {
        let Fixture {
            mut column,
            timeline,
            mut actions,
        } = fixture(None, FeedSnapshot::default(), true);
        timeline.send_modify(|snapshot| snapshot.is_partial = true);
        let id = column.id;
        column.update(Action::Updated(id)).expect("failed to update");
        drop(column);
        time::sleep(Duration::from_millis(10_000)).await;
        assert!(actions.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn watched_partial_flag_starts_polling() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture
            .column
            .init(Size::new(80, 20))
            .expect("failed to init");
        fixture
            .timeline
            .send_modify(|snapshot| snapshot.is_partial = true);
        let Some(action) = fixture.actions.recv().await else {
            panic!("watch task stopped");
        };
        assert!(matches!(action, Action::Updated(id) if id == fixture.column.id));
        fixture.column.update(action).expect("failed to update");
        assert!(fixture.column.is_polling());

        time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(fixture.timeline_actions(), [expand_newest()]);
    }

    #[tokio::test]
    async fn forwards_timeline_changes() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        fixture
            .column
            .init(Size::new(80, 20))
            .expect("failed to init");
        fixture.timeline.send_modify(|snapshot| snapshot.unread = 1);
        let id = fixture.column.id;
        assert!(matches!(
            fixture.actions.recv().await,
            Some(Action::Updated(updated)) if updated == id
        ));
    }

    #[test]
    fn title_markers() {
        let fixture = fixture(None, FeedSnapshot::default(), true);
        assert_eq!(fixture.column.title().to_string(), " Home ");

        let snapshot = FeedSnapshot {
            unread: 2,
            ..Default::default()
        };
        let fixture = self::fixture(Some("1"), snapshot, true);
        assert_eq!(fixture.column.title().to_string(), " Home ● 📌 ");
    }

    #[test]
    fn render_not_signed_in() {
        let mut fixture = fixture(None, recent_snapshot(), false);
        let screen = fixture.render();
        assert!(screen.contains("You are not signed in."));
        assert!(!screen.contains("post a"));
    }

    #[test]
    fn render_active_feed() {
        let mut fixture = fixture(None, recent_snapshot(), true);
        let screen = fixture.render();
        assert!(screen.contains("post b"));
        assert!(screen.contains("post a"));
        assert!(!screen.contains("Your home feed is quiet!"));
    }

    #[test]
    fn render_too_slow_feed() {
        let mut fixture = fixture(None, FeedSnapshot::default(), true);
        let screen = fixture.render();
        assert!(screen.contains("Your home feed is quiet!"));
        assert!(screen.contains("Your home timeline is empty!"));

        // Not shown until loading settles.
        fixture
            .timeline
            .send_modify(|snapshot| snapshot.is_loading = true);
        let screen = fixture.render();
        assert!(!screen.contains("Your home feed is quiet!"));
    }
}
