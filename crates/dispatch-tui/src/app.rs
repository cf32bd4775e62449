//! Application core: event loop, action dispatch, background tasks.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dispatch_core::{AssignmentStore, BoardConfig, FeedStatus, MemoryBackend, Reconciler, Roster};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::screens::BoardScreen;
use crate::theme;
use crate::tui::Tui;
use crate::worker::{StoreCommand, store_worker};

/// Ticks a notification stays on the status bar (4 Hz tick).
const NOTIFICATION_TICKS: u16 = 16;

/// Top-level application state and event loop.
pub struct App {
    board: BoardScreen,
    store: AssignmentStore<MemoryBackend>,
    config: BoardConfig,
    roster: Roster,
    /// Whether the app should keep running.
    running: bool,
    feed_status: FeedStatus,
    notification: Option<(Notification, u16)>,
    /// Writes handed to the worker and not yet settled.
    pending_writes: usize,
    /// Action sender: components and background tasks dispatch through this.
    action_tx: mpsc::UnboundedSender<Action>,
    /// Action receiver: main loop drains this.
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Set once `run` has spawned the store worker.
    store_tx: Option<mpsc::UnboundedSender<StoreCommand>>,
}

impl App {
    pub fn new(config: BoardConfig, roster: Roster, backend: MemoryBackend, touch: bool) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let store = AssignmentStore::new(Arc::new(backend), &config);

        Self {
            board: BoardScreen::new(&config, roster.clone(), touch),
            store,
            config,
            roster,
            running: true,
            feed_status: FeedStatus::Connecting,
            notification: None,
            pending_writes: 0,
            action_tx,
            action_rx,
            store_tx: None,
        }
    }

    /// Run the main event loop until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.board.init(self.action_tx.clone())?;
        let (width, height) = tui.size().unwrap_or((80, 24));
        debug!(screen = self.board.id(), width, height, "screen initialized");

        let cancel = CancellationToken::new();
        let reconciler = Reconciler::start(
            self.store.clone(),
            &self.config,
            || debug!("assignments reconciled"),
        );
        let tasks = self.spawn_tasks(&reconciler, &cancel);

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("board event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        cancel.cancel();
        reconciler.stop().await;
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        tui.exit();
        info!("board event loop ended");
        Ok(())
    }

    fn spawn_tasks(&mut self, reconciler: &Reconciler, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let (store_tx, store_rx) = mpsc::unbounded_channel();
        self.store_tx = Some(store_tx);

        vec![
            tokio::spawn(spawn_data_bridge(
                self.store.clone(),
                reconciler.status(),
                self.action_tx.clone(),
                cancel.clone(),
            )),
            tokio::spawn(store_worker(
                self.store.clone(),
                self.roster.clone(),
                store_rx,
                self.action_tx.clone(),
                cancel.clone(),
            )),
        ]
    }

    /// Global keys first, then the board.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) | (KeyModifiers::NONE, KeyCode::Char('q')) => {
                Ok(Some(Action::Quit))
            }
            _ => self.board.handle_key_event(key),
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        self.board.handle_mouse_event(mouse)
    }

    fn send_store(&mut self, cmd: StoreCommand) {
        let Some(tx) = &self.store_tx else {
            warn!(?cmd, "store worker not running, command dropped");
            return;
        };
        let is_write = !matches!(cmd, StoreCommand::Refresh);
        if tx.send(cmd).is_ok() && is_write {
            self.pending_writes += 1;
        }
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::Resize(w, h) => debug!(width = w, height = h, "terminal resized"),
            Action::Assign { officer_id, slot } => self.send_store(StoreCommand::Assign {
                officer_id: officer_id.clone(),
                slot: slot.clone(),
            }),
            Action::Unassign(officer_id) => self.send_store(StoreCommand::Unassign(officer_id.clone())),
            Action::Refresh => self.send_store(StoreCommand::Refresh),
            Action::WriteSettled => self.pending_writes = self.pending_writes.saturating_sub(1),
            Action::FeedStatusChanged(status) => {
                debug!(%status, "feed status");
                self.feed_status = *status;
            }
            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), NOTIFICATION_TICKS));
            }
            Action::Tick => {
                if let Some((_, ticks)) = &mut self.notification {
                    *ticks = ticks.saturating_sub(1);
                    if *ticks == 0 {
                        self.notification = None;
                    }
                }
            }
            _ => {}
        }

        if let Some(follow_up) = self.board.update(action)? {
            self.action_tx.send(follow_up)?;
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let [board_area, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

        self.board.render(frame, board_area);
        self.render_status_bar(frame, status_area);
    }

    /// Feed status, input mode, last refresh, then either a notification or key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode = if self.board.is_touch() { "touch" } else { "pointer" };
        let refreshed = self.store.last_refresh().map_or_else(
            || "never".to_owned(),
            |at| {
                let age = (chrono::Utc::now() - at).to_std().unwrap_or_default();
                let age = Duration::from_secs(age.as_secs());
                format!("{} ago", humantime::format_duration(age))
            },
        );

        let mut spans = vec![
            Span::raw(" "),
            Span::styled(format!("● {}", self.feed_status), theme::feed_status(self.feed_status)),
            Span::styled(format!(" │ {mode} │ refreshed {refreshed}"), theme::key_hint()),
        ];
        if self.pending_writes > 0 {
            spans.push(Span::styled(
                format!(" │ saving {}", self.pending_writes),
                theme::notification(crate::action::NotificationLevel::Warning),
            ));
        }
        spans.push(Span::styled(" │ ", theme::key_hint()));

        match &self.notification {
            Some((notification, _)) => {
                spans.push(Span::styled(
                    notification.message.clone(),
                    theme::notification(notification.level),
                ));
            }
            None => {
                for (key, label) in [
                    ("drag", " move  "),
                    ("1-9", " assign  "),
                    ("u", " unassign  "),
                    ("t", " touch  "),
                    ("r", " refresh  "),
                    ("q", " quit"),
                ] {
                    spans.push(Span::styled(key, theme::key_hint_key()));
                    spans.push(Span::styled(label, theme::key_hint()));
                }
            }
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
