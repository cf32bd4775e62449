//! Terminal event reader running in a background tokio task.
//!
//! Emits key, mouse and resize events plus two clocks: `Tick` (4 Hz)
//! drives long-press timers and status aging, `Render` (~30 FPS) redraws.

use std::time::Duration;

use crossterm::event::{
    Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Tick,
    Render,
}

pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    /// Spawn the reader with the given tick and render intervals.
    pub fn new(tick_rate: Duration, render_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(read_events(tx, tick_rate, render_rate, cancel.clone()));
        Self { rx, cancel }
    }

    /// Next event, or `None` once the reader has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_events(
    tx: mpsc::UnboundedSender<Event>,
    tick_rate: Duration,
    render_rate: Duration,
    cancel: CancellationToken,
) {
    let mut stream = EventStream::new();
    let mut tick = tokio::time::interval(tick_rate);
    let mut render = tokio::time::interval(render_rate);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    render.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            _ = tick.tick() => Event::Tick,
            _ = render.tick() => Event::Render,
            Some(Ok(raw)) = stream.next() => match raw {
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
                // Drags arrive as Down / Drag / Up; buttonless moves are noise.
                CrosstermEvent::Mouse(mouse) if mouse.kind != MouseEventKind::Moved => {
                    Event::Mouse(mouse)
                }
                CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
                _ => continue,
            },
        };

        if tx.send(event).is_err() {
            break;
        }
    }
    debug!("event reader stopped");
}
