//! Feed-side half of the ingestion pipeline: fetch raw XML, locate the
//! repeating item structure, and normalize items into canonical
//! [`jobsink_core::JobCandidate`]s.

pub mod client;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod xml;

pub use client::{FeedClient, FetchResult};
pub use error::FeedError;
pub use extract::{extract, RawItem};
pub use normalize::normalize;
pub use xml::parse_document;
