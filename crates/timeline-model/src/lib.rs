//! Cinecut Timeline Model
//!
//! Defines the data contracts for a non-destructive edit timeline:
//! - **Media:** references to external media, with missing/generator variants
//! - **Tracks:** ordered sequences of clips and gaps per kind
//! - **Timeline:** settings plus tracks, with a read-only query surface
//!
//! The model is consumed read-only by the compiler and the render
//! orchestrator; nothing in this crate mutates a timeline after load.

pub mod media;
pub mod timeline;
pub mod track;

pub use media::*;
pub use timeline::*;
pub use track::*;
