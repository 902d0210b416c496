//! Purpose: Library crate behind the `pob-bridge` sidecar binary.
//! Exports: `core` (build model, formatters, codec, errors), `bridge`, `sidecar`, `stats`.
//! Role: Path of Building import-code codec plus its line-delimited JSON protocol.
//! Invariants: No process-wide mutable state; configuration is passed in explicitly.
//! Invariants: Core modules are pure transforms and never touch I/O.
pub mod bridge;
pub mod core;
pub mod sidecar;
pub mod stats;
