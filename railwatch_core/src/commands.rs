//! Command Surface - validation of inbound commands.
//!
//! Request bodies arrive as loosely typed JSON. Every field is optional at
//! the deserialization layer so that a missing or mistyped field becomes a
//! [`CoreError::InvalidInput`] here rather than a framework rejection.
//! Both snake_case names and the original client's camelCase names
//! (`trackId`, `trainId`) are accepted.

use crate::engine::{PositionReport, RailEngine};
use crate::error::CoreError;
use crate::signals::{Level, Side, SignalTable};
use crate::stop::StopRecord;
use railwatch_env::RailContext;
use serde::Deserialize;
use serde_json::Value;

/// `submit_position` body: `{lat, lng}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionCommand {
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lng: Option<Value>,
}

impl PositionCommand {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(Value::from(lat)),
            lng: Some(Value::from(lng)),
        }
    }

    /// Both coordinates, present and numeric.
    pub fn coordinates(&self) -> Result<(f64, f64), CoreError> {
        match (numeric(&self.lat), numeric(&self.lng)) {
            (Some(lat), Some(lng)) => Ok((lat, lng)),
            _ => Err(CoreError::invalid_input("Missing lat or lng")),
        }
    }
}

fn numeric(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(Value::as_f64)
}

/// `advance_signal` body.
///
/// The side is named either explicitly (`side: "left"`) or, as the
/// dashboard does, by sending a `left`/`right` key with a level name.
/// The level value only selects the side; it is never assigned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalCommand {
    #[serde(default, alias = "trackId")]
    pub track_id: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub left: Option<Value>,
    #[serde(default)]
    pub right: Option<Value>,
}

impl SignalCommand {
    pub fn toggle(track_id: &str, side: Side) -> Self {
        Self {
            track_id: Some(track_id.to_string()),
            side: Some(side.to_string()),
            ..Self::default()
        }
    }

    pub fn track_id(&self) -> Result<&str, CoreError> {
        self.track_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::invalid_input("Missing trackId or signal state"))
    }

    /// Sides to advance, left before right.
    pub fn sides(&self) -> Result<Vec<Side>, CoreError> {
        if let Some(side) = &self.side {
            return Ok(vec![side.parse()?]);
        }

        let mut sides = Vec::new();
        if names_level(&self.left) {
            sides.push(Side::Left);
        }
        if names_level(&self.right) {
            sides.push(Side::Right);
        }

        if sides.is_empty() {
            return Err(CoreError::invalid_input("Missing trackId or signal state"));
        }
        Ok(sides)
    }
}

fn names_level(value: &Option<Value>) -> bool {
    value
        .as_ref()
        .and_then(Value::as_str)
        .map(|s| s.parse::<Level>().is_ok())
        .unwrap_or(false)
}

/// `trigger_stop` body: `{entity_id}` or `{trainId}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopCommand {
    #[serde(default, alias = "trainId")]
    pub entity_id: Option<String>,
}

impl StopCommand {
    pub fn new(entity_id: &str) -> Self {
        Self {
            entity_id: Some(entity_id.to_string()),
        }
    }

    pub fn entity_id(&self) -> Result<&str, CoreError> {
        self.entity_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| CoreError::invalid_input("Missing trainId"))
    }
}

impl<Ctx: RailContext> RailEngine<Ctx> {
    /// `submit_position(lat, lng) -> {fix, nearest}`
    pub fn submit_position(&self, command: &PositionCommand) -> Result<PositionReport, CoreError> {
        let (lat, lng) = command.coordinates()?;
        self.update_position(lat, lng)
    }

    /// `advance_signal(track_id, side) -> {signal_table}`
    pub fn submit_signal(&self, command: &SignalCommand) -> Result<SignalTable, CoreError> {
        let track_id = command.track_id()?;
        let sides = command.sides()?;
        self.advance_signals(track_id, &sides)
    }

    /// `trigger_stop(entity_id) -> {entity_id, issued_at}`
    pub fn submit_stop(&self, command: &StopCommand) -> Result<StopRecord, CoreError> {
        self.trigger_stop(command.entity_id()?)
    }
}
