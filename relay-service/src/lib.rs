//! Push relay service.
//!
//! Devices register a six-character code mapped to their push token; anyone
//! holding the code can send that device a notification.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
