//! Post source implementations.
//!
//! Each source implements [`PostSource`](crate::traits::PostSource):
//! - `http` - JSON search service paged by cursor

pub mod http;

pub use http::HttpPostSource;
