//! Data model and wire types shared across the reconciler.

pub mod config;
pub mod desired;
pub mod feedback;
pub mod file;
pub mod inventory;
pub mod protocol;
