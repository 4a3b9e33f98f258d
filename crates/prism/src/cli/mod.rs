//! Command handlers.

pub mod config;
pub mod fonts;
pub mod run;
