//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Time sources for frame budgets
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
