//! Deterministic trade-decision pipeline.
//!
//! Given a price-level event and an immutable market-data snapshot, the
//! pipeline produces either a `NO_TRADE` verdict or a fully specified order
//! plan (entry, stop, three targets, size, risk/reward). Invariants:
//!
//! 1. `decide(event, snapshot, config)` is pure and deterministic — repeated
//!    invocations over identical inputs yield byte-identical records.
//! 2. Every missing or malformed input fails closed: the result is a
//!    `NO_TRADE` record carrying the specific cause, never a silently
//!    degraded trade.
//! 3. Safety gates short-circuit in a fixed order; a gate that cannot
//!    evaluate counts as a failed gate.

pub mod candle;
pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod indicators;
pub mod kevlar;
pub mod levels;
pub mod order_plan;
pub mod pscore;
pub mod regime;
pub mod snapshot;

pub use config::PipelineConfig;
pub use decision::{decide, Decision, DecisionRecord, NoTradeReason};
pub use error::CoreError;
pub use event::{EventType, Side, SignalEvent};
pub use snapshot::MarketSnapshot;
