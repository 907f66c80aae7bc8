//! Common types for the Railwatch environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a connected observer.
///
/// Observers carry no persisted identity; the id exists only so the hub
/// can remove the right queue on disconnect and so logs can name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    /// Creates a new random ObserverId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
    
    /// Creates a deterministic ObserverId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_from_seed_is_deterministic() {
        assert_eq!(ObserverId::from_seed(3), ObserverId::from_seed(3));
        assert_ne!(ObserverId::from_seed(3), ObserverId::from_seed(4));
    }
    
    #[test]
    fn test_random_ids_differ() {
        assert_ne!(ObserverId::new(), ObserverId::new());
    }
    
    #[test]
    fn test_display_is_short() {
        assert_eq!(ObserverId::new().to_string().len(), 8);
    }
}
