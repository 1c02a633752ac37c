//! Note search entry points.
//!
//! There is no index: search is a linear scan over the loaded notes.

pub mod text;
