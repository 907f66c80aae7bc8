//! Signal Registry - per-track, per-side three-aspect signals.
//!
//! Operators never set an aspect directly. Every command advances one
//! side of one track a single step around the fixed cycle
//! `safe → caution → danger → safe`.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Signal aspect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Safe,
    Caution,
    Danger,
}

impl Level {
    /// The single forward step of the cycle.
    pub fn next(self) -> Self {
        match self {
            Level::Safe => Level::Caution,
            Level::Caution => Level::Danger,
            Level::Danger => Level::Safe,
        }
    }
    
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Safe => "safe",
            Level::Caution => "caution",
            Level::Danger => "danger",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = CoreError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "safe" => Ok(Level::Safe),
            "caution" => Ok(Level::Caution),
            "danger" => Ok(Level::Danger),
            _ => Err(CoreError::invalid_input(format!("Unknown signal level: {s}"))),
        }
    }
}

/// Which signal head on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Side {
    type Err = CoreError;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            _ => Err(CoreError::invalid_input(format!("Unknown signal side: {s}"))),
        }
    }
}

/// Both signal heads of one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPair {
    pub left: Level,
    pub right: Level,
}

impl SignalPair {
    pub fn get(&self, side: Side) -> Level {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
    
    fn slot(&mut self, side: Side) -> &mut Level {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Full signal table keyed by track id.
pub type SignalTable = BTreeMap<String, SignalPair>;

/// Holds one [`SignalPair`] per pre-registered track.
///
/// The key set is fixed at construction; unknown ids are rejected and
/// never auto-created.
#[derive(Debug, Clone)]
pub struct SignalRegistry {
    table: SignalTable,
}

impl SignalRegistry {
    /// Registers every track with both sides at `safe`.
    pub fn new<S: AsRef<str>>(track_ids: &[S]) -> Self {
        let table = track_ids
            .iter()
            .map(|id| (id.as_ref().to_string(), SignalPair::default()))
            .collect();
        Self { table }
    }
    
    pub fn contains(&self, track_id: &str) -> bool {
        self.table.contains_key(track_id)
    }
    
    pub fn get(&self, track_id: &str) -> Option<SignalPair> {
        self.table.get(track_id).copied()
    }
    
    pub fn table(&self) -> &SignalTable {
        &self.table
    }
    
    /// Advances one side one step and returns the new level.
    pub fn advance(&mut self, track_id: &str, side: Side) -> Result<Level, CoreError> {
        let pair = self
            .table
            .get_mut(track_id)
            .ok_or_else(|| CoreError::not_found(format!("Track ID not found: {track_id}")))?;
        
        let slot = pair.slot(side);
        *slot = slot.next();
        Ok(*slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn registry() -> SignalRegistry {
        SignalRegistry::new(&["track-up", "track-down"])
    }
    
    #[test]
    fn test_initial_state_is_all_safe() {
        let registry = registry();
        assert_eq!(registry.table().len(), 2);
        for pair in registry.table().values() {
            assert_eq!(*pair, SignalPair::default());
            assert_eq!(pair.left, Level::Safe);
        }
    }
    
    #[test]
    fn test_literal_cycle_order() {
        let mut registry = registry();
        assert_eq!(registry.get("track-up").unwrap().left, Level::Safe);
        
        let seen: Vec<Level> = (0..3)
            .map(|_| registry.advance("track-up", Side::Left).unwrap())
            .collect();
        
        assert_eq!(seen, vec![Level::Caution, Level::Danger, Level::Safe]);
    }
    
    #[test]
    fn test_sides_are_independent() {
        let mut registry = registry();
        registry.advance("track-down", Side::Right).unwrap();
        
        let pair = registry.get("track-down").unwrap();
        assert_eq!(pair.left, Level::Safe);
        assert_eq!(pair.right, Level::Caution);
        assert_eq!(registry.get("track-up").unwrap(), SignalPair::default());
    }
    
    #[test]
    fn test_unknown_track_is_not_found_and_not_created() {
        let mut registry = registry();
        let err = registry.advance("track-side", Side::Left).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(!registry.contains("track-side"));
    }
    
    #[test]
    fn test_cycle_closure_from_every_level() {
        for start in [Level::Safe, Level::Caution, Level::Danger] {
            assert_eq!(start.next().next().next(), start);
        }
        assert_eq!(Level::Danger.next(), Level::Safe);
    }
    
    #[test]
    fn test_parse_levels_and_sides() {
        assert_eq!("Danger".parse::<Level>().unwrap(), Level::Danger);
        assert!("green".parse::<Level>().is_err());
        assert_eq!("RIGHT".parse::<Side>().unwrap(), Side::Right);
        assert!("middle".parse::<Side>().is_err());
    }
    
    #[test]
    fn test_table_serializes_lowercase() {
        let json = serde_json::to_value(registry().table()).unwrap();
        assert_eq!(json["track-up"]["left"], "safe");
    }
}
