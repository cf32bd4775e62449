// ── Runtime board configuration ──
//
// Describes the slot list and gesture tuning. Never touches disk: the
// TUI (through dispatch-config) constructs a `BoardConfig` and hands it in.

use std::time::Duration;

use crate::error::CoreError;
use crate::model::SlotName;

/// Default long-press duration before a touch becomes a drag.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(500);

/// Default slot list for a fresh board.
pub const DEFAULT_SLOTS: [&str; 5] = ["Unassigned", "Patrol", "Traffic", "Investigations", "Dispatch"];

/// Configuration for a single dispatch board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Fixed, ordered slot names. Unknown names are rejected by `assign`.
    pub slots: Vec<SlotName>,
    /// Hold time before a touch arms into a drag.
    pub long_press: Duration,
    /// Movement (in cells) tolerated while a touch is armed.
    pub touch_tolerance: u16,
    /// Polling interval used when the change feed is unavailable. Zero = never.
    pub polling_interval: Duration,
    /// Subscribe to the change feed at all.
    pub realtime_enabled: bool,
}

impl BoardConfig {
    /// Build a config with default tuning around the given slot names.
    pub fn with_slots<I, S>(slots: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SlotName>,
    {
        let config = Self {
            slots: slots.into_iter().map(Into::into).collect(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject empty or duplicated slot lists and a zero long-press.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.slots.is_empty() {
            return Err(CoreError::Config {
                message: "at least one slot is required".into(),
            });
        }
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.as_str().trim().is_empty() {
                return Err(CoreError::Config {
                    message: format!("slot #{} has an empty name", idx + 1),
                });
            }
            if self.slots[..idx].contains(slot) {
                return Err(CoreError::Config {
                    message: format!("duplicate slot name: {slot}"),
                });
            }
        }
        if self.long_press.is_zero() {
            return Err(CoreError::Config {
                message: "long press duration must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn has_slot(&self, slot: &SlotName) -> bool {
        self.slots.contains(slot)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS.iter().map(|s| SlotName::from(*s)).collect(),
            long_press: DEFAULT_LONG_PRESS,
            touch_tolerance: 1,
            polling_interval: Duration::from_secs(10),
            realtime_enabled: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BoardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.long_press, Duration::from_millis(500));
        assert!(config.has_slot(&"Patrol".into()));
    }

    #[test]
    fn duplicate_slots_are_rejected() {
        let err = BoardConfig::with_slots(["Patrol", "Traffic", "Patrol"]).unwrap_err();
        assert!(err.to_string().contains("duplicate slot name: Patrol"));
    }

    #[test]
    fn empty_slot_list_is_rejected() {
        assert!(BoardConfig::with_slots(Vec::<String>::new()).is_err());
        assert!(BoardConfig::with_slots(["Patrol", " "]).is_err());
    }

    #[test]
    fn zero_long_press_is_rejected() {
        let config = BoardConfig {
            long_press: Duration::ZERO,
            ..BoardConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
