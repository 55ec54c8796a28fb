//! Prefix enumeration module
//!
//! This module implements the depth-first traversal of the alphabetic query
//! space that drives the crawl:
//!
//! - `QueryPrefix`: an immutable ordered sequence of letters A-Z used as the
//!   current search string
//! - `PrefixEnumerator`: a cursor over the prefix space with odometer-style
//!   `advance` and on-demand `subdivide`

mod cursor;
mod prefix;

// Re-export main types
pub use cursor::{PrefixEnumerator, Step};
pub use prefix::QueryPrefix;
