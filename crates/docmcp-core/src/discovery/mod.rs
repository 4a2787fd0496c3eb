//! Deciding which URLs a crawl visits.
//!
//! - [`filter`]: safety, same-origin and static-asset predicates
//! - [`links`]: spec and page links proposed by a fetched page
//! - [`probe`]: well-known spec locations and REST roots for the fallback stage

pub mod filter;
pub mod links;
pub mod probe;

pub use filter::{is_acceptable, is_same_origin};
pub use links::{DiscoveredLinks, discover_links};
pub use probe::{probe_rest_prefixes, spec_probe_urls};
