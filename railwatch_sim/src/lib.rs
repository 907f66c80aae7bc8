//! Railwatch Deterministic Simulation Harness
//!
//! Runs the real [`RailEngine`](railwatch_core::RailEngine) against a
//! virtual clock and a seeded oracle so every run is reproducible from a
//! single 64-bit seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                     │
//! │  ┌────────────┐   commands   ┌──────────────────┐    │
//! │  │   Oracle   │ ───────────► │ RailEngine<Sim>  │    │
//! │  │ (ChaCha8)  │ ◄─ compare ─ │                  │    │
//! │  └────────────┘              └────────┬─────────┘    │
//! │                                       │ push         │
//! │  ┌────────────┐  advance_time  ┌──────▼──────┐       │
//! │  │ SimContext │ ─────────────► │  observers  │       │
//! │  └────────────┘                └─────────────┘       │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use railwatch_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_steps(100).run(ScenarioId::StopStorm);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod oracle;
mod runner;
pub mod scenarios;

pub use context::{settle, SimContext, SIM_EPOCH_SECS};
pub use error::SimError;
pub use oracle::{ExpectedNearest, Oracle};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
