//! Railwatch Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the Railwatch engine run
//! in both **Production** (tokio, wall clock) and **Simulation** (virtual
//! clock) environments.
//!
//! The engine never reads the clock or spawns a task directly. Everything
//! that depends on time goes through [`RailContext`]:
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Deferred work (`spawn()`)
//!
//! # Example
//!
//! ```ignore
//! use railwatch_env::{RailContext, TokioContext};
//!
//! async fn braking_notice<Ctx: RailContext>(ctx: &Ctx) {
//!     ctx.sleep(Duration::from_secs(2)).await;
//!     publish_braking();
//! }
//! ```

mod context;
mod types;
mod error;
mod tokio_impl;

pub use context::RailContext;
pub use types::ObserverId;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
