//! HTTP transport to the Frappe host.
//!
//! [`FrappeClient`] posts JSON or multipart bodies to whitelisted methods
//! and implements [`AssistantApi`], the typed seam the chat and document
//! components depend on.

pub mod api;
pub mod client;
pub mod error;

pub use api::AssistantApi;
pub use client::{FrappeClient, CSRF_HEADER};
pub use error::TransportError;
