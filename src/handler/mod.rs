//! Request handler module
//!
//! Routing, the country endpoints, request body decoding and image serving.

pub mod countries;
pub mod form;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
