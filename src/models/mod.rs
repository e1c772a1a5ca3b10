//! # src/models/mod.rs
//!
//! Bündelt alle Datenmodelle der Bibliothek.

pub mod config;
pub mod contract;
pub mod identity;
pub mod log;
