//! Core types and definitions for the WARFRONT simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! components, remote requests, notifications, snapshot views, catalogs,
//! settings and constants. It has no dependency on any runtime or
//! transport layer.

pub mod catalog;
pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod events;
pub mod settings;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
