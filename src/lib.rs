// src/lib.rs

//! Web Monitor Library
//!
//! Polls registered web resources, detects changes against the last stored
//! snapshot and notifies subscribers about newly added content items.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
