//! `qs-domain`: shared vocabulary for the qsched workspace.
//!
//! Holds the pieces every other crate agrees on: the shared [`error::Error`]
//! type, the YAML [`config::Config`] model, loosely typed wire values
//! ([`types::RawSlot`], [`types::ExportFormat`]) and the structured
//! [`trace::TraceEvent`] log lines.

pub mod config;
pub mod error;
pub mod trace;
pub mod types;
