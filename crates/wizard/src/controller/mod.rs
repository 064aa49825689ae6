//! Controller layer: wizard state, shell-facing outcomes and submission assembly.

pub mod events;
pub mod orchestration;
pub mod submission;
