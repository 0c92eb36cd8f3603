//! Headless lane battle runner for scripted play and CI verification.
//!
//! This crate drives a [`lane_core::simulation::Simulation`] without any
//! presentation layer. It supports:
//!
//! - **Scripted play**: a controller process sends JSON commands on stdin
//! - **Balance runs**: many autopiloted matches in parallel
//! - **Determinism checks**: the same seed replayed and hashed
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, spawn, damage, etc.)
//! - **stdout**: Events, state and responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command and response reference.
//!
//! # Example
//!
//! ```bash
//! # Play the built-in skirmish
//! echo '{"cmd":"tick","count":20}' | cargo run -p lane_headless
//!
//! # Load a match file
//! cargo run -p lane_headless -- run --scenario assets/data/skirmish.ron
//!
//! # Check that a seed replays identically
//! cargo run -p lane_headless -- verify --seed 7 --runs 4
//! ```

pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector};
pub use protocol::{Command, Response};
pub use runner::{run_session, HeadlessConfig, Session};
pub use scenario::{load_match, ScenarioError};
