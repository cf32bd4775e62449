//! Board screen: one column per slot, one card per officer.
//!
//! Columns are drop zones and cards are drag sources. In pointer mode the
//! mouse drives the native drag protocol; with `--touch` the same mouse
//! events are replayed as touch-start / touch-move / touch-end so the
//! long-press and synthetic-signal path can be exercised from a terminal.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use indexmap::IndexMap;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use dispatch_core::{
    AssignmentSnapshot, BoardConfig, DragContext, DragSource, DragState, DropZone,
    Haptics, Officer, OfficerId, Point, Rect as HitRect, Roster, SlotName, ZoneId,
};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

/// Render ticks a haptic pulse stays visible.
const PULSE_FRAMES: u8 = 6;

/// Terminal stand-in for a vibration motor: flashes the drag proxy.
struct FlashHaptics(Rc<Cell<u8>>);

impl Haptics for FlashHaptics {
    fn pulse(&self) {
        self.0.set(PULSE_FRAMES);
    }
}

/// The gesture the mouse is currently driving.
#[derive(Debug, Clone)]
enum Gesture {
    Pointer {
        officer_id: OfficerId,
        data: String,
        at: Point,
    },
    Touch {
        officer_id: OfficerId,
    },
}

impl Gesture {
    fn officer_id(&self) -> &OfficerId {
        match self {
            Self::Pointer { officer_id, .. } | Self::Touch { officer_id } => officer_id,
        }
    }
}

/// Card hit boxes recorded during the last render.
#[derive(Default)]
struct CardMap {
    cards: Vec<(HitRect, OfficerId)>,
}

impl CardMap {
    fn at(&self, point: Point) -> Option<&OfficerId> {
        self.cards
            .iter()
            .find(|(rect, _)| rect.contains(point))
            .map(|(_, id)| id)
    }
}

pub struct BoardScreen {
    ctx: DragContext,
    roster: Roster,
    slots: Vec<SlotName>,
    touch: bool,
    snapshot: Arc<AssignmentSnapshot>,
    zones: Vec<DropZone>,
    sources: IndexMap<OfficerId, DragSource>,
    selected: Option<OfficerId>,
    gesture: Option<Gesture>,
    pulse: Rc<Cell<u8>>,
    card_map: RefCell<CardMap>,
}

impl BoardScreen {
    pub fn new(config: &BoardConfig, roster: Roster, touch: bool) -> Self {
        let pulse = Rc::new(Cell::new(0));
        let ctx = DragContext::new(config).with_haptics(Rc::new(FlashHaptics(Rc::clone(&pulse))));
        let mut screen = Self {
            ctx,
            roster,
            slots: config.slots.clone(),
            touch,
            snapshot: Arc::new(AssignmentSnapshot::empty(&config.slots)),
            zones: Vec::new(),
            sources: IndexMap::new(),
            selected: None,
            gesture: None,
            pulse,
            card_map: RefCell::new(CardMap::default()),
        };
        let officers: Vec<Officer> = screen.roster.iter().map(|o| (**o).clone()).collect();
        for officer in officers {
            screen.ensure_source(officer);
        }
        screen.selected = screen.roster.ids().next().cloned();
        screen
    }

    pub fn is_touch(&self) -> bool {
        self.touch
    }

    fn ensure_source(&mut self, officer: Officer) {
        if !self.sources.contains_key(&officer.id) {
            let id = officer.id.clone();
            let source = self.ctx.source(officer);
            self.sources.insert(id, source);
        }
    }

    /// Officers per column: every slot in order, then the off-board tray.
    fn columns(&self) -> Vec<Vec<OfficerId>> {
        let mut columns: Vec<Vec<OfficerId>> = self
            .snapshot
            .iter()
            .map(|(_, officers)| officers.to_vec())
            .collect();
        columns.push(self.off_board());
        columns
    }

    /// Roster officers with no slot.
    fn off_board(&self) -> Vec<OfficerId> {
        self.roster
            .ids()
            .filter(|id| !self.snapshot.contains(id))
            .cloned()
            .collect()
    }

    fn position_of(&self, officer: &OfficerId) -> Option<(usize, usize)> {
        self.columns().iter().enumerate().find_map(|(col, officers)| {
            officers
                .iter()
                .position(|o| o == officer)
                .map(|row| (col, row))
        })
    }

    /// Move the keyboard selection by whole columns or rows.
    fn move_selection(&mut self, d_col: isize, d_row: isize) {
        let columns = self.columns();
        let (col, row) = self
            .selected
            .as_ref()
            .and_then(|id| self.position_of(id))
            .unwrap_or((0, 0));

        let col = step(col, d_col, columns.len());
        let Some(officers) = columns.get(col) else {
            return;
        };
        if officers.is_empty() {
            return;
        }
        let row = if d_col == 0 {
            step(row, d_row, officers.len())
        } else {
            row.min(officers.len() - 1)
        };
        self.selected = officers.get(row).cloned();
    }

    // ── Gestures ─────────────────────────────────────────────────────

    fn source(&self, officer_id: &OfficerId) -> Option<&DragSource> {
        self.sources.get(officer_id)
    }

    fn press(&mut self, at: Point, now: Instant) {
        if self.ctx.interaction(at) > 0 {
            debug!(x = at.x, y = at.y, "drag guard reset a stuck source");
        }
        self.settle_gesture();
        if self.gesture.is_some() {
            return;
        }

        let Some(officer_id) = self.card_map.borrow().at(at).cloned() else {
            return;
        };
        self.selected = Some(officer_id.clone());
        let Some(source) = self.source(&officer_id) else {
            return;
        };

        if self.touch {
            source.touch_start(at, now);
            self.gesture = Some(Gesture::Touch { officer_id });
        } else if let Some(data) = source.pointer_down(at) {
            self.gesture = Some(Gesture::Pointer {
                officer_id,
                data,
                at,
            });
        }
    }

    fn drag_to(&mut self, to: Point, now: Instant) {
        match &mut self.gesture {
            Some(Gesture::Touch { officer_id }) => {
                if let Some(source) = self.sources.get(officer_id) {
                    source.touch_move(to, now);
                }
            }
            Some(Gesture::Pointer { officer_id, at, .. }) => {
                *at = to;
                if let Some(source) = self.sources.get(officer_id) {
                    source.pointer_move(to);
                }
            }
            None => {}
        }
        if matches!(self.gesture, Some(Gesture::Pointer { .. })) {
            let target = self.ctx.zones().zone_at(to);
            self.hover_native(target.as_ref());
        }
        self.settle_gesture();
    }

    fn release(&mut self, at: Point, now: Instant) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        let Some(source) = self.source(gesture.officer_id()).cloned() else {
            return;
        };

        match gesture {
            Gesture::Touch { .. } => source.touch_end(at, now),
            Gesture::Pointer { data, .. } => {
                // Only a zone that saw drag-over this gesture takes the drop;
                // a click with no movement is a cancel.
                let target = self.ctx.zones().zone_at(at);
                let dropped = target
                    .and_then(|id| self.zones.iter().find(|z| *z.id() == id))
                    .filter(|zone| zone.is_hovering())
                    .is_some_and(|zone| zone.drop(&data));
                self.hover_native(None);
                source.pointer_up(dropped);
            }
        }
    }

    /// Emulate native drag-over / drag-leave for pointer drags.
    fn hover_native(&self, target: Option<&ZoneId>) {
        for zone in &self.zones {
            if Some(zone.id()) == target {
                if !zone.is_hovering() {
                    zone.drag_over();
                }
            } else if zone.is_hovering() {
                zone.drag_leave();
            }
        }
    }

    fn cancel_gesture(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            if let Some(source) = self.source(gesture.officer_id()) {
                source.force_reset();
            }
            self.hover_native(None);
        }
    }

    /// Forget a gesture whose source has gone idle underneath us.
    fn settle_gesture(&mut self) {
        let idle = self
            .gesture
            .as_ref()
            .and_then(|g| self.source(g.officer_id()))
            .is_none_or(|s| s.state() == DragState::Idle);
        if idle && self.gesture.take().is_some() {
            self.hover_native(None);
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn card_line(&self, officer_id: &OfficerId, width: u16) -> Line<'static> {
        let available = self
            .roster
            .get(officer_id)
            .is_none_or(|o| o.status.is_available());
        let state = self.source(officer_id).map_or(DragState::Idle, DragSource::state);
        let style = match state {
            DragState::Active => theme::card_lifted(),
            DragState::Armed => theme::card_armed(),
            DragState::Idle if self.selected.as_ref() == Some(officer_id) => theme::card_selected(),
            DragState::Idle => theme::card(),
        };
        let label = truncate(&self.roster.label(officer_id), usize::from(width.saturating_sub(2)));
        Line::from(vec![
            Span::styled("● ", theme::status_dot(available)),
            Span::styled(label, style),
        ])
    }

    fn render_column(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: String,
        officers: &[OfficerId],
        zone: Option<&DropZone>,
    ) {
        let hovering = zone.is_some_and(DropZone::is_hovering);
        let block = Block::default()
            .title(title)
            .title_style(theme::column_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if hovering {
                theme::column_hover()
            } else {
                theme::column_border()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let Some(zone) = zone {
            zone.set_bounds(to_hit_rect(area));
        }

        let mut cards = self.card_map.borrow_mut();
        for (row, officer_id) in officers.iter().enumerate().take(usize::from(inner.height)) {
            let Ok(offset) = u16::try_from(row) else {
                break;
            };
            let card = Rect::new(inner.x, inner.y + offset, inner.width, 1);
            if let Some(source) = self.source(officer_id) {
                source.set_bounds(to_hit_rect(card));
            }
            cards.cards.push((to_hit_rect(card), officer_id.clone()));
            frame.render_widget(Paragraph::new(self.card_line(officer_id, card.width)), card);
        }
    }

    fn render_proxy(&self, frame: &mut Frame, area: Rect) {
        let Some(gesture) = &self.gesture else {
            return;
        };
        let position = match gesture {
            Gesture::Pointer { at, .. } => Some(*at),
            Gesture::Touch { officer_id } => self.source(officer_id).and_then(DragSource::proxy),
        };
        let Some(at) = position else {
            return;
        };

        let label = format!(" {} ", self.roster.label(gesture.officer_id()));
        let width = u16::try_from(label.chars().count()).unwrap_or(u16::MAX);
        let proxy = Rect::new(at.x.saturating_add(1), at.y, width, 1).intersection(area);
        if proxy.is_empty() {
            return;
        }
        let mut style = theme::drag_proxy();
        if self.pulse.get() % 2 == 1 {
            style = style.add_modifier(ratatui::style::Modifier::REVERSED);
        }
        frame.render_widget(Clear, proxy);
        frame.render_widget(Paragraph::new(Span::styled(label, style)), proxy);
    }
}

impl Component for BoardScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.zones = self
            .slots
            .iter()
            .map(|slot| {
                let tx = action_tx.clone();
                self.ctx
                    .zone(ZoneId::from(slot), HitRect::default(), move |event| {
                        let _ = tx.send(Action::Assign {
                            officer_id: event.officer_id,
                            slot: SlotName::from(&event.zone_id),
                        });
                    })
            })
            .collect();
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => Some(Action::CancelDrag),
            (_, KeyCode::Left | KeyCode::Char('h')) => {
                self.move_selection(-1, 0);
                None
            }
            (_, KeyCode::Right | KeyCode::Char('l')) => {
                self.move_selection(1, 0);
                None
            }
            (_, KeyCode::Up | KeyCode::Char('k')) => {
                self.move_selection(0, -1);
                None
            }
            (_, KeyCode::Down | KeyCode::Char('j')) => {
                self.move_selection(0, 1);
                None
            }
            (KeyModifiers::NONE, KeyCode::Char('u')) => self.selected.clone().map(Action::Unassign),
            (KeyModifiers::NONE, KeyCode::Char('r')) => Some(Action::Refresh),
            (KeyModifiers::NONE, KeyCode::Char('t')) => Some(Action::ToggleTouch),
            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='9')) => {
                let index = c.to_digit(10).and_then(|d| usize::try_from(d).ok()).unwrap_or(0);
                let slot = index.checked_sub(1).and_then(|i| self.slots.get(i)).cloned();
                match (self.selected.clone(), slot) {
                    (Some(officer_id), Some(slot)) => Some(Action::Assign { officer_id, slot }),
                    _ => None,
                }
            }
            _ => None,
        };
        Ok(action)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        let at = Point::new(mouse.column, mouse.row);
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.press(at, now),
            MouseEventKind::Drag(MouseButton::Left) => self.drag_to(at, now),
            MouseEventKind::Up(MouseButton::Left) => self.release(at, now),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Tick => {
                if let Some(Gesture::Touch { officer_id }) = &self.gesture {
                    if let Some(source) = self.sources.get(officer_id) {
                        source.tick(Instant::now());
                    }
                }
                self.settle_gesture();
            }
            Action::Render => {
                self.pulse.set(self.pulse.get().saturating_sub(1));
            }
            Action::SnapshotUpdated(snapshot) => {
                self.snapshot = Arc::clone(snapshot);
                let unknown: Vec<OfficerId> = snapshot
                    .iter()
                    .flat_map(|(_, officers)| officers.iter())
                    .filter(|id| !self.sources.contains_key(*id))
                    .cloned()
                    .collect();
                for id in unknown {
                    let label = id.to_string();
                    self.ensure_source(Officer::new(id, label));
                }
            }
            Action::CancelDrag => self.cancel_gesture(),
            Action::ToggleTouch => {
                self.cancel_gesture();
                self.touch = !self.touch;
                debug!(touch = self.touch, "input mode toggled");
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        self.card_map.borrow_mut().cards.clear();

        let [columns_area, tray_area] =
            Layout::vertical([Constraint::Min(4), Constraint::Length(3)]).areas(area);

        let count = u32::try_from(self.slots.len()).unwrap_or(1).max(1);
        let constraints = self.slots.iter().map(|_| Constraint::Ratio(1, count));
        let column_areas = Layout::horizontal(constraints).split(columns_area);

        for (idx, (slot, officers)) in self.snapshot.iter().enumerate() {
            let Some(col_area) = column_areas.get(idx) else {
                break;
            };
            let zone = self.zones.get(idx);
            let title = format!(" {slot} ({}) ", officers.len());
            self.render_column(frame, *col_area, title, officers, zone);
        }

        self.render_tray(frame, tray_area);
        self.render_proxy(frame, area);
    }

    fn id(&self) -> &str {
        "board"
    }
}

impl BoardScreen {
    /// Off-board officers, laid out left to right. Not a drop zone.
    fn render_tray(&self, frame: &mut Frame, area: Rect) {
        let off_board = self.off_board();
        let block = Block::default()
            .title(format!(" Off board ({}) ", off_board.len()))
            .title_style(theme::column_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::column_border());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut cards = self.card_map.borrow_mut();
        let mut x = inner.x;
        for officer_id in &off_board {
            let label = self.roster.label(officer_id);
            let width = u16::try_from(label.chars().count() + 2).unwrap_or(u16::MAX);
            if x.saturating_add(width) > inner.right() {
                break;
            }
            let card = Rect::new(x, inner.y, width, inner.height.min(1));
            if let Some(source) = self.source(officer_id) {
                source.set_bounds(to_hit_rect(card));
            }
            cards.cards.push((to_hit_rect(card), officer_id.clone()));
            frame.render_widget(Paragraph::new(self.card_line(officer_id, width)), card);
            x = x.saturating_add(width + 2);
        }
    }
}

fn to_hit_rect(area: Rect) -> HitRect {
    HitRect::new(area.x, area.y, area.width, area.height)
}

/// Wrap-free step within `0..len`, clamped at both ends.
fn step(from: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    from.saturating_add_signed(delta).min(len - 1)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
