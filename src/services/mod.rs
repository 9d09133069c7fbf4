//! Service layer for content delivery.
//!
//! - Upstream retrieval (`HttpFetcher`)
//! - Rendition resolution (`RepresentationResolver`)
//! - Cache-first delivery (`ContentDelivery`)

mod delivery;
mod fetcher;
mod resolver;

pub use delivery::ContentDelivery;
pub use fetcher::{HttpFetcher, RemoteFetcher};
pub use resolver::RepresentationResolver;
