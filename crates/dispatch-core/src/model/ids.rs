// ── Core identity types ──
//
// OfficerId, SlotName and ZoneId are the keys every other domain type
// hangs off. They are plain strings on the wire, distinct types in code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of an officer, owned by the roster collaborator.
    OfficerId
);

string_id!(
    /// Name of an assignment slot (e.g. a patrol beat).
    SlotName
);

string_id!(
    /// Identity of a drop zone. Synthetic drop signals are addressed by it.
    ZoneId
);

impl From<&SlotName> for ZoneId {
    fn from(slot: &SlotName) -> Self {
        Self(slot.0.clone())
    }
}

impl From<&ZoneId> for SlotName {
    fn from(zone: &ZoneId) -> Self {
        Self(zone.0.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn officer_id_display_round_trips_raw_string() {
        let id = OfficerId::from("O1");
        assert_eq!(id.to_string(), "O1");
        assert_eq!(id.as_str(), "O1");
    }

    #[test]
    fn slot_name_from_str() {
        let slot: SlotName = "Patrol".parse().unwrap();
        assert_eq!(slot, SlotName::new("Patrol"));
    }

    #[test]
    fn zone_id_converts_from_slot() {
        let slot = SlotName::from("Traffic");
        assert_eq!(ZoneId::from(&slot).as_str(), "Traffic");
        assert_eq!(SlotName::from(&ZoneId::from(&slot)), slot);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&OfficerId::from("O7")).unwrap();
        assert_eq!(json, "\"O7\"");
    }
}
