//! Helpers shared by the command surface.
//!
//! - `resolve` - Script identifier resolution with fuzzy suggestions

pub mod resolve;
