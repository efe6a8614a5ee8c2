//! Small shared helpers.

pub(crate) mod align;
pub mod size;
