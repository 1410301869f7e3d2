//! Shared data models for the vmix frame-mixing pipeline.
//!
//! This crate provides the pure, process-free types:
//! - Probed video asset metadata
//! - Frame-position plans and the output cadence table
//! - Duration-tiered encoding profiles
//! - Pipeline configuration

pub mod config;
pub mod encoding;
pub mod plan;
pub mod video;

// Re-export common types
pub use config::PipelineConfig;
pub use encoding::EncodingProfile;
pub use plan::{plan_positions, MixPlan, OutputCadence, PlanCursor, PlanError, SlotSource};
pub use video::VideoAsset;
