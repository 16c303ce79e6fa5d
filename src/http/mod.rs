//! HTTP boundary types.
//!
//! # Data Flow
//! ```text
//! handler
//!     → response.rs (Response envelope: status, headers, data, metaData)
//!     → axum IntoResponse (status + headers applied, envelope JSON body)
//!     → Send to client
//! ```

pub mod response;

pub use response::Response;
