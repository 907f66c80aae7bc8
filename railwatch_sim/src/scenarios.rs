//! Simulation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: random fixes checked against the oracle
    CorridorSweep,
    
    /// SIM-002: signal cycle closure on every track and side
    SignalCycle,
    
    /// SIM-003: rapid emergency-stop re-triggers
    StopStorm,
    
    /// SIM-004: observers joining and leaving mid-broadcast
    ObserverChurn,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::CorridorSweep,
            ScenarioId::SignalCycle,
            ScenarioId::StopStorm,
            ScenarioId::ObserverChurn,
        ]
    }
    
    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CorridorSweep => "corridor_sweep",
            ScenarioId::SignalCycle => "signal_cycle",
            ScenarioId::StopStorm => "stop_storm",
            ScenarioId::ObserverChurn => "observer_churn",
        }
    }
    
    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::CorridorSweep => "Random fixes around the corridor, nearest waypoint and risk vs brute force",
            ScenarioId::SignalCycle => "Random one-step advances, every side follows safe -> caution -> danger",
            ScenarioId::StopStorm => "Overlapping stop triggers, last write wins and every timeline completes",
            ScenarioId::ObserverChurn => "Connect/disconnect/vanish during commands, snapshot first and shared order",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;
    
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "corridor_sweep" | "corridorsweep" | "sim-001" => Ok(ScenarioId::CorridorSweep),
            "signal_cycle" | "signalcycle" | "sim-002" => Ok(ScenarioId::SignalCycle),
            "stop_storm" | "stopstorm" | "sim-003" => Ok(ScenarioId::StopStorm),
            "observer_churn" | "observerchurn" | "sim-004" => Ok(ScenarioId::ObserverChurn),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
