//! Yield derivation for Teller group pools
//!
//! `curve` holds the rate model, `enricher` turns raw subgraph rows into
//! USD figures and APYs, `projector` shapes them into published records.

pub mod curve;
pub mod enricher;
pub mod projector;

pub use enricher::enrich;
pub use projector::{app_network, project, PositionRecord};
