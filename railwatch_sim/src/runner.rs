//! Scenario runner - drives the engine against the oracle on a virtual clock.

use crate::context::{settle, SimContext};
use crate::error::{check, SimError};
use crate::oracle::Oracle;
use crate::scenarios::ScenarioId;

use chrono::{DateTime, Utc};
use railwatch_core::{
    CoreError, EngineConfig, Level, PushMessage, RailEngine, RailEvent, Side, StopPhase,
    Subscription, WaypointCatalog,
};
use railwatch_env::{ObserverId, RailContext};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Decorrelates the oracle stream from the context seed
const ORACLE_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Virtual time step used while waiting for stop timelines
const TICK: Duration = Duration::from_millis(250);

/// Order a signal side walks through, starting from its initial level
const CYCLE: [Level; 3] = [Level::Safe, Level::Caution, Level::Danger];

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Steps requested
    pub steps: usize,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Commands accepted by the engine
    pub commands: u64,

    /// Commands rejected as expected
    pub rejected: u64,

    /// Push messages drained from observer queues
    pub events_observed: u64,

    /// Fixes that raised the collision flag
    pub risk_flags: u64,

    /// Most observers connected at once
    pub observers_peak: usize,
}

/// One simulated dashboard.
struct Watcher {
    subscription: Subscription,
    /// Position in the global event log at connect time
    start: usize,
    received: Vec<RailEvent>,
}

impl Watcher {
    fn id(&self) -> ObserverId {
        self.subscription.id
    }
}

/// Everything currently queued for one observer.
fn drain(subscription: &mut Subscription) -> Vec<Arc<PushMessage>> {
    let mut messages = Vec::new();
    while let Ok(message) = subscription.receiver.try_recv() {
        messages.push(message);
    }
    messages
}

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Commands per scenario
    steps: usize,

    /// Engine configuration under test
    config: EngineConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            steps: 200,
            config: EngineConfig::default(),
        }
    }

    /// Sets the number of commands per scenario.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps.max(1);
        self
    }

    /// Sets the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let context = SimContext::shared(self.seed);
        let outcome = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime.block_on(async {
                match scenario {
                    ScenarioId::CorridorSweep => self.run_corridor_sweep(&context).await,
                    ScenarioId::SignalCycle => self.run_signal_cycle(&context).await,
                    ScenarioId::StopStorm => self.run_stop_storm(&context).await,
                    ScenarioId::ObserverChurn => self.run_observer_churn(&context).await,
                }
            }),
            Err(e) => Err(SimError::from(e)),
        };

        let (passed, failure_reason, metrics) = match outcome {
            Ok(metrics) => (true, None, metrics),
            Err(e) => (false, Some(e.to_string()), ScenarioMetrics::default()),
        };

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            steps: self.steps,
            final_time_secs: context.now().as_secs_f64(),
            failure_reason,
            metrics,
        }
    }

    fn engine(&self, context: &Arc<SimContext>, config: EngineConfig) -> RailEngine<SimContext> {
        RailEngine::new(Arc::clone(context), WaypointCatalog::coimbatore(), config)
    }

    fn oracle(&self, engine: &RailEngine<SimContext>) -> Oracle {
        Oracle::new(
            engine.context().seed() ^ ORACLE_SALT,
            engine.catalog().clone(),
            engine.config().collision_threshold_km,
        )
    }

    /// Connects an observer and consumes its opening snapshot.
    fn connect(&self, engine: &RailEngine<SimContext>) -> Result<Subscription, SimError> {
        let mut subscription = engine.connect();
        let expected = engine.snapshot();
        let first = subscription.receiver.try_recv().ok();
        check(
            first.as_deref().and_then(PushMessage::as_snapshot) == Some(&expected),
            || format!("observer {} did not open with the current snapshot", subscription.id),
        )?;
        Ok(subscription)
    }

    /// SIM-001: CorridorSweep - nearest waypoint and risk against brute force.
    async fn run_corridor_sweep(&self, context: &Arc<SimContext>) -> Result<ScenarioMetrics, SimError> {
        let engine = self.engine(context, self.config.clone());
        let mut oracle = self.oracle(&engine);
        let mut observer = self.connect(&engine)?;
        let mut metrics = ScenarioMetrics::default();

        for step in 0..self.steps {
            let fix = oracle.random_fix();
            let report = engine.update_position(fix.lat, fix.lng)?;
            metrics.commands += 1;

            let expected = oracle
                .expected_nearest(fix)
                .ok_or_else(|| SimError::Assertion("oracle has no waypoints".to_string()))?;
            let nearest = &report.nearest;

            check(
                nearest.name == expected.name && nearest.lat == expected.lat && nearest.lng == expected.lng,
                || format!("step {}: engine chose {} but oracle chose {}", step, nearest.name, expected.name),
            )?;
            check((nearest.distance_km - expected.distance_km).abs() < 1e-9, || {
                format!(
                    "step {}: distance {} km vs oracle {} km",
                    step, nearest.distance_km, expected.distance_km
                )
            })?;
            check(nearest.risk == expected.risk, || {
                format!("step {}: risk {} at {:.4} km", step, nearest.risk, nearest.distance_km)
            })?;
            if nearest.risk {
                metrics.risk_flags += 1;
            }

            let pushed = drain(&mut observer);
            metrics.events_observed += pushed.len() as u64;
            check(
                pushed.len() == 1 && pushed[0].as_event() == Some(&report.to_event()),
                || format!("step {}: expected exactly one matching LOCATION_UPDATE", step),
            )?;

            context.advance_time(Duration::from_secs(1));
        }

        // Out-of-range fixes are rejected without touching state
        let before = engine.snapshot();
        match engine.update_position(91.0, 76.97) {
            Err(CoreError::InvalidInput(_)) => metrics.rejected += 1,
            other => {
                return Err(SimError::Assertion(format!(
                    "out-of-range fix was not rejected: {:?}",
                    other
                )))
            }
        }
        check(engine.snapshot() == before, || "rejected fix changed state".to_string())?;
        check(drain(&mut observer).is_empty(), || "rejected fix was broadcast".to_string())?;

        debug!("corridor_sweep: {} risk flags in {} fixes", metrics.risk_flags, metrics.commands);
        Ok(metrics)
    }

    /// SIM-002: SignalCycle - every side walks safe -> caution -> danger -> safe.
    async fn run_signal_cycle(&self, context: &Arc<SimContext>) -> Result<ScenarioMetrics, SimError> {
        let engine = self.engine(context, self.config.clone());
        let mut oracle = self.oracle(&engine);
        let mut observer = self.connect(&engine)?;
        let mut metrics = ScenarioMetrics::default();

        let tracks = engine.config().track_ids.clone();
        let mut advances: HashMap<(String, Side), usize> = HashMap::new();

        // Full cycle closes on every side
        for track in &tracks {
            for side in [Side::Left, Side::Right] {
                for expected in [Level::Caution, Level::Danger, Level::Safe] {
                    let level = engine.advance_signal(track, side)?;
                    metrics.commands += 1;
                    check(level == expected, || {
                        format!("{} {}: got {}, expected {}", track, side, level, expected)
                    })?;
                }
            }
        }
        metrics.events_observed += drain(&mut observer).len() as u64;

        for step in 0..self.steps {
            let Some(track) = oracle.pick(&tracks).cloned() else {
                break;
            };
            let side = oracle.random_side();

            let table = engine.advance_signals(&track, &[side])?;
            metrics.commands += 1;

            let count = advances.entry((track.clone(), side)).or_insert(0);
            *count += 1;
            let expected = CYCLE[*count % CYCLE.len()];
            let actual = table.get(&track).map(|pair| pair.get(side));
            check(actual == Some(expected), || {
                format!("step {}: {} {} is {:?}, expected {}", step, track, side, actual, expected)
            })?;

            let pushed = drain(&mut observer);
            metrics.events_observed += pushed.len() as u64;
            let update = RailEvent::SignalUpdate { signals: table };
            check(
                pushed.len() == 1 && pushed[0].as_event() == Some(&update),
                || format!("step {}: expected exactly one matching SIGNAL_UPDATE", step),
            )?;

            context.advance_time(Duration::from_millis(oracle.gap_ms(500)));
        }

        // Unknown tracks leave the table alone
        let before = engine.snapshot().signals;
        match engine.advance_signal("sim-unregistered-track", Side::Left) {
            Err(CoreError::NotFound(_)) => metrics.rejected += 1,
            other => {
                return Err(SimError::Assertion(format!(
                    "unknown track was not rejected: {:?}",
                    other
                )))
            }
        }
        check(engine.snapshot().signals == before, || "rejected advance changed signals".to_string())?;

        let signals = engine.snapshot().signals;
        for ((track, side), count) in &advances {
            let actual = signals.get(track).map(|pair| pair.get(*side));
            check(actual == Some(CYCLE[count % CYCLE.len()]), || {
                format!("{} {} ended at {:?} after {} advances", track, side, actual, count)
            })?;
        }

        Ok(metrics)
    }

    /// SIM-003: StopStorm - last write wins, every timeline completes on schedule.
    async fn run_stop_storm(&self, context: &Arc<SimContext>) -> Result<ScenarioMetrics, SimError> {
        let config = EngineConfig {
            cancel_stale_stop_timers: false,
            ..self.config.clone()
        };
        let schedule = config.stop_schedule;
        let engine = self.engine(context, config.clone());
        let mut oracle = self.oracle(&engine);
        let mut observer = self.connect(&engine)?;
        let mut metrics = ScenarioMetrics::default();

        let triggers = self.steps.clamp(2, 16);
        let mut observed: Vec<(RailEvent, DateTime<Utc>)> = Vec::new();
        let mut last = None;

        for i in 0..triggers {
            let entity_id = format!("train-{}", i);
            let record = engine.trigger_stop(&entity_id)?;
            metrics.commands += 1;

            let now: DateTime<Utc> = context.system_time().into();
            check(record.issued_at == now, || {
                format!("{} stamped {} at virtual {}", entity_id, record.issued_at, now)
            })?;
            last = Some(record);
            self.collect(context, &mut observer, &mut observed);

            context.advance_time(Duration::from_millis(oracle.gap_ms(1500)));
            settle().await;
            self.collect(context, &mut observer, &mut observed);
        }

        self.run_clock(context, schedule.stopped_after + TICK, &mut observer, &mut observed)
            .await;
        metrics.events_observed += observed.len() as u64;

        check(engine.snapshot().emergency_stop == last, || {
            "snapshot does not hold the most recent stop".to_string()
        })?;

        let count = |pred: &dyn Fn(&RailEvent) -> bool| observed.iter().filter(|(e, _)| pred(e)).count();
        let stops = count(&|e| matches!(e, RailEvent::EmergencyStop { .. }));
        let braking = count(&|e| matches!(e, RailEvent::StopProgress { phase: StopPhase::Braking, .. }));
        let stopped = count(&|e| matches!(e, RailEvent::StopProgress { phase: StopPhase::Stopped, .. }));
        check(stops == triggers && braking == triggers && stopped == triggers, || {
            format!(
                "{} triggers produced {} stops, {} braking, {} stopped",
                triggers, stops, braking, stopped
            )
        })?;

        for (position, (event, seen_at)) in observed.iter().enumerate() {
            let RailEvent::StopProgress { entity_id, phase, issued_at } = event else {
                continue;
            };
            let delay = match phase {
                StopPhase::Braking => schedule.braking_after,
                StopPhase::Stopped => schedule.stopped_after,
            };
            let due = *issued_at + chrono::Duration::milliseconds(delay.as_millis() as i64);
            check(*seen_at >= due, || format!("{} {:?} arrived early at {}", entity_id, phase, seen_at))?;

            if *phase == StopPhase::Stopped {
                let braked_first = observed[..position].iter().any(|(e, _)| {
                    matches!(e, RailEvent::StopProgress { entity_id: id, phase: StopPhase::Braking, .. } if id == entity_id)
                });
                check(braked_first, || format!("{} stopped before braking", entity_id))?;
            }
        }

        // Hardened mode keeps only the newest timeline
        let hardened = self.engine(
            context,
            EngineConfig {
                cancel_stale_stop_timers: true,
                ..config
            },
        );
        let mut watcher = self.connect(&hardened)?;
        let mut hardened_seen = Vec::new();

        hardened.trigger_stop("train-superseded")?;
        context.advance_time(schedule.braking_after / 4);
        hardened.trigger_stop("train-current")?;
        metrics.commands += 2;

        self.run_clock(context, schedule.stopped_after + TICK, &mut watcher, &mut hardened_seen)
            .await;
        metrics.events_observed += hardened_seen.len() as u64;

        let progress: Vec<&str> = hardened_seen
            .iter()
            .filter_map(|(event, _)| match event {
                RailEvent::StopProgress { entity_id, .. } => Some(entity_id.as_str()),
                _ => None,
            })
            .collect();
        check(progress == ["train-current", "train-current"], || {
            format!("hardened engine delivered {:?}", progress)
        })?;

        Ok(metrics)
    }

    /// SIM-004: ObserverChurn - snapshot first, then the shared event log.
    async fn run_observer_churn(&self, context: &Arc<SimContext>) -> Result<ScenarioMetrics, SimError> {
        let engine = self.engine(context, self.config.clone());
        let mut oracle = self.oracle(&engine);
        let mut metrics = ScenarioMetrics::default();

        let tracks = engine.config().track_ids.clone();
        let mut log: Vec<RailEvent> = Vec::new();
        let mut watchers: Vec<Watcher> = Vec::new();
        let mut vanished = 0usize;

        for step in 0..self.steps {
            match oracle.gap_ms(99) {
                0..=19 => {
                    let subscription = self.connect(&engine)?;
                    debug!("step {}: {} connected", step, subscription.id);
                    watchers.push(Watcher {
                        subscription,
                        start: log.len(),
                        received: Vec::new(),
                    });
                }
                20..=29 if !watchers.is_empty() => {
                    let watcher = watchers.remove(oracle.index(watchers.len()));
                    verify_watcher(&watcher, &log)?;
                    check(engine.disconnect(watcher.id()), || {
                        format!("{} was not registered at disconnect", watcher.id())
                    })?;
                }
                30..=34 if !watchers.is_empty() => {
                    // Dropped without a goodbye; the hub finds out on the next publish
                    let watcher = watchers.remove(oracle.index(watchers.len()));
                    verify_watcher(&watcher, &log)?;
                    vanished += 1;
                }
                35..=69 => {
                    let fix = oracle.random_fix();
                    let report = engine.update_position(fix.lat, fix.lng)?;
                    log.push(report.to_event());
                    metrics.commands += 1;
                }
                _ => {
                    if let Some(track) = oracle.pick(&tracks).cloned() {
                        let side = oracle.random_side();
                        let signals = engine.advance_signals(&track, &[side])?;
                        log.push(RailEvent::SignalUpdate { signals });
                        metrics.commands += 1;
                    }
                }
            }

            for watcher in &mut watchers {
                for message in drain(&mut watcher.subscription) {
                    metrics.events_observed += 1;
                    let event = message.as_event().cloned().ok_or_else(|| {
                        SimError::Assertion(format!("{} received a second snapshot", watcher.id()))
                    })?;
                    watcher.received.push(event);
                }
            }
            metrics.observers_peak = metrics.observers_peak.max(watchers.len());
            context.advance_time(Duration::from_millis(100));
        }

        // One more publish flushes any vanished observers
        let fix = oracle.random_fix();
        let report = engine.update_position(fix.lat, fix.lng)?;
        log.push(report.to_event());
        metrics.commands += 1;
        for watcher in &mut watchers {
            for message in drain(&mut watcher.subscription) {
                if let Some(event) = message.as_event() {
                    watcher.received.push(event.clone());
                }
            }
        }

        check(engine.observer_count() == watchers.len(), || {
            format!(
                "{} observers registered, {} alive ({} vanished)",
                engine.observer_count(),
                watchers.len(),
                vanished
            )
        })?;
        for watcher in &watchers {
            verify_watcher(watcher, &log)?;
        }

        Ok(metrics)
    }

    /// Moves drained events into `seen`, stamped with the virtual wall clock.
    fn collect(
        &self,
        context: &SimContext,
        subscription: &mut Subscription,
        seen: &mut Vec<(RailEvent, DateTime<Utc>)>,
    ) {
        let now: DateTime<Utc> = context.system_time().into();
        for message in drain(subscription) {
            if let Some(event) = message.as_event() {
                seen.push((event.clone(), now));
            }
        }
    }

    /// Advances the clock in `TICK` steps for `span`, collecting as it goes.
    async fn run_clock(
        &self,
        context: &SimContext,
        span: Duration,
        subscription: &mut Subscription,
        seen: &mut Vec<(RailEvent, DateTime<Utc>)>,
    ) {
        let mut elapsed = Duration::ZERO;
        while elapsed < span {
            context.advance_time(TICK);
            elapsed += TICK;
            settle().await;
            self.collect(context, subscription, seen);
        }
    }
}

/// A live observer saw exactly the events published since it connected.
fn verify_watcher(watcher: &Watcher, log: &[RailEvent]) -> Result<(), SimError> {
    let expected = log.get(watcher.start..).unwrap_or_default();
    check(watcher.received.as_slice() == expected, || {
        format!(
            "{} saw {} events, expected {} since connecting",
            watcher.id(),
            watcher.received.len(),
            expected.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass() {
        for scenario in ScenarioId::all() {
            let result = ScenarioRunner::new(42).with_steps(60).run(scenario);
            assert!(
                result.passed,
                "{} failed: {:?}",
                scenario,
                result.failure_reason
            );
        }
    }

    #[test]
    fn test_multiple_seeds_pass() {
        for seed in [1, 7, 1234, u64::MAX] {
            let result = ScenarioRunner::new(seed).with_steps(40).run(ScenarioId::ObserverChurn);
            assert!(result.passed, "seed {} failed: {:?}", seed, result.failure_reason);
        }
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let a = ScenarioRunner::new(99).with_steps(50).run(ScenarioId::CorridorSweep);
        let b = ScenarioRunner::new(99).with_steps(50).run(ScenarioId::CorridorSweep);
        assert_eq!(a.metrics.risk_flags, b.metrics.risk_flags);
        assert_eq!(a.final_time_secs, b.final_time_secs);
    }

    #[test]
    fn test_stop_storm_advances_virtual_time() {
        let result = ScenarioRunner::new(3).with_steps(4).run(ScenarioId::StopStorm);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.final_time_secs >= 8.0);
        assert_eq!(result.metrics.commands, 6);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_stop_deadline_fixed_at_trigger() {
        let context = SimContext::shared(11);
        let engine = RailEngine::new(
            Arc::clone(&context),
            WaypointCatalog::coimbatore(),
            EngineConfig::default(),
        );
        let mut observer = engine.connect();
        observer.receiver.try_recv().unwrap();

        engine.trigger_stop("train-late").unwrap();
        // Clock moves before the sequence tasks ever run
        context.advance_time(Duration::from_secs(2));
        settle().await;

        let phases: Vec<StopPhase> = drain(&mut observer)
            .iter()
            .filter_map(|m| match m.as_event() {
                Some(RailEvent::StopProgress { phase, .. }) => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![StopPhase::Braking]);

        context.advance_time(Duration::from_secs(2));
        settle().await;
        assert_eq!(drain(&mut observer).len(), 1);
    }

    #[test]
    fn test_custom_threshold_still_matches_oracle() {
        let config = EngineConfig {
            collision_threshold_km: 3.0,
            ..EngineConfig::default()
        };
        let result = ScenarioRunner::new(5)
            .with_steps(80)
            .with_config(config)
            .run(ScenarioId::CorridorSweep);
        assert!(result.passed, "{:?}", result.failure_reason);
    }
}
