//! Requirements document → task candidates.
//!
//! The sectionizer builds the section tree; the synthesizer turns each
//! section into at most one task using the keyword tables in [`rules`].

pub mod rules;
pub mod sectionizer;
pub mod synthesizer;

pub use sectionizer::{sectionize, Section};
pub use synthesizer::{section_to_task, synthesize};
