//! Board palette and semantic styles.

use ratatui::style::{Color, Modifier, Style};

use dispatch_core::FeedStatus;

use crate::action::NotificationLevel;

// ── Core Palette ──────────────────────────────────────────────────────

pub const ELECTRIC_PURPLE: Color = Color::Rgb(225, 53, 255); // #e135ff
pub const NEON_CYAN: Color = Color::Rgb(128, 255, 234); // #80ffea
pub const CORAL: Color = Color::Rgb(255, 106, 193); // #ff6ac1
pub const ELECTRIC_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54); // #282a36
pub const BG_DARK: Color = Color::Rgb(30, 31, 41); // #1e1f29

// ── Slot columns ──────────────────────────────────────────────────────

pub fn column_title() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}

pub fn column_border() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// A column the dragged card is currently over.
pub fn column_hover() -> Style {
    Style::default()
        .fg(ELECTRIC_PURPLE)
        .add_modifier(Modifier::BOLD)
}

// ── Officer cards ─────────────────────────────────────────────────────

pub fn card() -> Style {
    Style::default().fg(DIM_WHITE)
}

pub fn card_selected() -> Style {
    Style::default()
        .fg(ELECTRIC_PURPLE)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// The card's home position while it is being dragged.
pub fn card_lifted() -> Style {
    Style::default()
        .fg(BORDER_GRAY)
        .add_modifier(Modifier::DIM | Modifier::ITALIC)
}

/// Touch hold in progress, not yet a drag.
pub fn card_armed() -> Style {
    Style::default()
        .fg(ELECTRIC_YELLOW)
        .add_modifier(Modifier::UNDERLINED)
}

/// Floating copy of the card that follows the finger or pointer.
pub fn drag_proxy() -> Style {
    Style::default()
        .fg(BG_DARK)
        .bg(CORAL)
        .add_modifier(Modifier::BOLD)
}

pub fn status_dot(available: bool) -> Style {
    if available {
        Style::default().fg(SUCCESS_GREEN)
    } else {
        Style::default().fg(BORDER_GRAY)
    }
}

// ── Status bar ────────────────────────────────────────────────────────

pub fn feed_status(status: FeedStatus) -> Style {
    let color = match status {
        FeedStatus::Live => SUCCESS_GREEN,
        FeedStatus::Polling | FeedStatus::Connecting => ELECTRIC_YELLOW,
        FeedStatus::Stale | FeedStatus::Stopped => ERROR_RED,
    };
    Style::default().fg(color)
}

pub fn notification(level: NotificationLevel) -> Style {
    let color = match level {
        NotificationLevel::Info => DIM_WHITE,
        NotificationLevel::Success => SUCCESS_GREEN,
        NotificationLevel::Warning => ELECTRIC_YELLOW,
        NotificationLevel::Error => ERROR_RED,
    };
    Style::default().fg(color)
}

pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD)
}
