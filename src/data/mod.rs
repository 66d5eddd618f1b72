//! External data sources: the CSSE CSV feeds and the population reference.

pub mod feeds;
pub mod population;

pub use feeds::{FeedClient, FeedSnapshot, FeedUrls};
pub use population::PopulationReference;
