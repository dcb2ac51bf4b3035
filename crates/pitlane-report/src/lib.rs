//! C9 — durable run artefacts: `junit.xml`, `meta.yaml`, and per-unit
//! `conversation.json`. HTML rendering is out of scope; this crate only
//! produces the machine-readable artefacts a separate renderer would
//! consume.

pub mod junit;
pub mod meta;
pub mod transcript;

pub use junit::{write_junit_report, SuiteReport};
pub use meta::{write_meta, RunMeta};
pub use transcript::write_conversation;
