//! Data engine of the canopy outliner.
//!
//! Documents live in a flat, id-addressed [`graph::Graph`]. Ownership forms a
//! tree over it, links may point anywhere, and every edit goes through the
//! invariant-preserving operations in [`graph`]. [`outline::Outline`] wraps a
//! graph into an editing session with undo; [`storage`] persists it.

pub mod config;
pub mod demo;
pub mod error;
pub mod format;
pub mod graph;
pub mod models;
pub mod outline;
pub mod storage;
pub mod tree;
pub mod undo;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use graph::Graph;
pub use outline::Outline;
