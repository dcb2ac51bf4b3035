//! C3 — one strategy implementation per assistant CLI, dispatched through
//! the closed `AdapterKind` enum rather than runtime subclass discovery.

pub mod adapter;
pub mod commands;
pub mod mcp;
pub mod parsers;

pub use adapter::{Adapter, AdapterRunConfig};
