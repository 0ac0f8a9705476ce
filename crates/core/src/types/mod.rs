//! Core types for the tutor orchestrator.
//!
//! This module provides the data model shared by every pipeline stage.

pub mod conversation;
pub mod intent;
pub mod mastery;
pub mod profile;
pub mod style;
pub mod tool;

pub use conversation::{ChatMessage, ConversationContext, Role};
pub use intent::{EducationalIntent, IntentCategory};
pub use mastery::{MasteryLevel, MasteryLevelError};
pub use profile::UserInfo;
pub use style::*;
pub use tool::{ParameterSet, ToolRequest, ToolResponse};
