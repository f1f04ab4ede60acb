//! ZKAuth agent SDK
//!
//! Builds proof-carrying authorization requests and submits them to the
//! gateway. The agent never holds the downstream credential.

pub mod client;
pub mod requester;

pub use client::{ClientError, GatewayClient, GatewayReply};
pub use requester::{AuthorizationRequester, PushFilePayload, RequesterError};
