pub mod cache;
pub mod error;
pub mod extract;
pub mod listing;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod site;
pub mod summarize;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use cache::CachingFetcher;
pub use error::AppError;
pub use extract::RecordBuilder;
pub use listing::{ListingWalker, PenaltyPages};
pub use models::{ActionType, EnforcementRecord};
pub use pipeline::{Pipeline, RunOutcome, run_listing_pass};
pub use publish::{PublishReport, Publisher, PublisherConfig};
pub use site::Site;
pub use summarize::{Abbreviations, AliasRule, Summarizer};
pub use traits::{Fetcher, ImageRenderer, NullRenderer, Poster, RecordStore, RecordTransaction};
