//! Request and response types for the chat HTTP API.

pub mod request;
pub mod response;
