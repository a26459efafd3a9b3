//! Cinecut Timeline Compiler
//!
//! Translates a non-destructive edit timeline into an MLT XML composition
//! program the `melt` render engine can execute.
//!
//! # Pipeline Architecture
//!
//! ```text
//! timeline ──┐
//!            ├── Collect producers (dedup by media id)
//! profile ───┘         │
//!                      ├── Classify kind (video/audio/image)
//!                      │
//!                      ├── Per-track playlists (blanks + entries)
//!                      │
//!                      ▼
//!               Master tractor (video beneath, audio muted-video)
//!                      │
//!                      ▼
//!                  MLT XML program
//! ```
//!
//! Compilation is a pure function: the same timeline and profile always
//! produce byte-identical output.

pub mod profile;
pub mod program;
pub mod xml;

pub use profile::*;
pub use program::*;
