//! Element locator
//!
//! Re-finds an indexed snapshot node in the live document:
//! - rebuilds a selector from the structural path, class tokens and stable attributes
//! - queries the top-level document
//! - falls back through isolation roots and embedded documents by locating the
//!   boundary host first

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
