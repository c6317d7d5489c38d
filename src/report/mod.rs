//! Report renderers.
//!
//! - [`terminal`] — colored summary boxes and tables for analyses, training
//!   runs, attributions and history statistics; respects `--verbose` / `--quiet`.
//!
//! JSON output is produced directly with `serde_json` in `main`.

pub mod terminal;
