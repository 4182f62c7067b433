use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a loaded world (dimension) on the host server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub Uuid);

impl WorldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world:{}", self.0.simple())
    }
}

/// Identifier of a player (or any entity) able to pilot a craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PilotId(pub Uuid);

impl PilotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PilotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PilotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pilot:{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(WorldId::new(), WorldId::new());
        assert_ne!(PilotId::new(), PilotId::new());
    }

    #[test]
    fn display_is_prefixed() {
        let id = PilotId::new();
        assert!(id.to_string().starts_with("pilot:"));
        assert!(WorldId::new().to_string().starts_with("world:"));
    }
}
