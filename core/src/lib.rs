//! appeals-core — weekly fraud-appeal metrics, spike detection, and
//! report composition.
//!
//! PIPELINE ORDER (fixed, documented, never reordered):
//!   1. Warehouse fetch     (`warehouse`, five sequential queries)
//!   2. Normalization       (`record`)
//!   3. Period aggregation  (`period`, current and previous, then diffed)
//!   4. Breakdowns          (`breakdown`, rules / rates / countries)
//!   5. Daily trends        (`daily_trends`, independent of 3–4)
//!   6. Report composition  (`report`)
//!
//! External collaborators — the warehouse, the history store, and the
//! message sink — sit behind trait seams; everything between them is
//! synchronous, pure, and reentrant.

pub mod breakdown;
pub mod config;
pub mod daily_trends;
pub mod delivery;
pub mod error;
pub mod period;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod sample;
pub mod schedule;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod warehouse;
