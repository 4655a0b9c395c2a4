//! Wire-level constants and the user header set.
//!
//! - [`constants`] - header names and media types of the push wire format
//! - [`headers`] - parsing and applying `key=value` header specifications

pub mod constants;
pub mod headers;

pub use headers::{parse_header_spec, HeaderSet, HeaderSpec};
