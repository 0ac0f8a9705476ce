//! Tutor Orchestrator Core - Shared types library.
//!
//! This crate provides the types passed between the orchestrator stages and
//! the tools it dispatches to:
//! - `orchestrator` - Classification, extraction, validation and dispatch
//! - `cli` - Operator commands built on the orchestrator library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no model
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Student profile, conversation, intent and tool wire types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
