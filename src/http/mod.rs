//! HTTP protocol layer module
//!
//! Response builders, MIME lookup and `ETag` helpers, independent of the country domain.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_404_response, build_405_response, build_error_response,
    build_health_response, build_json_response, build_options_response,
};
