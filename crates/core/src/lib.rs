//! Core business logic for friendful.

pub mod services;

pub use services::*;
