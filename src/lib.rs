//! Lead Wizard — multi-step lead-capture form engine.

pub mod config;
pub mod error;
pub mod wizard;
