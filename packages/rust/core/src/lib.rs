//! Core pipeline orchestration for assetforge.
//!
//! This crate ties overlay resolution and the transform adapters into the
//! end-to-end asset build: stage sequencing, locale fan-out, the cache-bust
//! registry, the serialized course stage, sitemap aggregation, and
//! watch-mode invalidation.

pub mod courses;
pub mod fanout;
pub mod pipeline;
pub mod registry;
pub mod sitemap;
pub mod watch;

pub use pipeline::{
    BuildOptions, BuildReporter, BuildSummary, PipelineContext, SilentReporter, build_assets,
};
pub use registry::{CacheBustRegistry, content_hash8};
pub use sitemap::SitemapAggregator;
pub use watch::{RebuildFn, RebuildOutcome, WatchInvalidator};
