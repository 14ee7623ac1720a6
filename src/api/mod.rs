//! Remote PDF API: routes, wire types and the HTTP client

mod client;
mod endpoints;
mod types;

pub use client::ApiClient;
pub use endpoints::{ApiEndpoints, Conversion, Operation};
pub use types::{
    Comparison, DocumentId, OperationOutcome, RequestBody, ResultReference, UploadedDocument,
};
