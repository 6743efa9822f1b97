//! Scrape a Yelp business page and/or the Fusion API into a canonical
//! business record, then render two QA-ready text corpora: business facts
//! and bucketed reviews.
//!
//! The entry point is [`pipeline::Pipeline`]; everything network-facing is
//! configured through [`config::PipelineConfig`]. The QA engine that consumes
//! the corpora is external, reached through the [`qa::QaEngine`] seam.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod format;
pub mod fusion;
pub mod pipeline;
pub mod qa;
pub mod record;
pub mod reviews;
pub mod text;
