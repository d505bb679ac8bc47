//! Legality checking for accelerator designs.
//!
//! A design is accepted only if [`passes::WellFormed`] finds nothing wrong
//! with it. The analyses it relies on live in [`analysis`] and are usable on
//! their own.
pub mod analysis;
pub mod passes;
pub mod traversal;
