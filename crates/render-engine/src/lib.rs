//! Cinecut Render Engine
//!
//! Owns everything between a compiled composition program and a finished
//! file on disk:
//!
//! ```text
//! timeline ──┐
//!            ├── Preset resolver ──► profile + encode settings
//! options ───┘         │
//!                      ▼
//!              Timeline compiler (cinecut-compiler)
//!                      │
//!                      ▼
//!              Render orchestrator ──► job registry, progress, ETA
//!                      │
//!                      ▼
//!              Melt gateway (external `melt` process)
//! ```
//!
//! The orchestrator is generic over the [`engine::RenderEngine`] trait so
//! tests and embedders can drive it without a real melt installation.

pub mod engine;
pub mod job;
pub mod orchestrator;
pub mod preset;

pub use engine::*;
pub use job::*;
pub use orchestrator::*;
pub use preset::*;
