//! # mailsync-remote
//!
//! HTTP transport for the SnappyMail/RainLoop JSON action protocol.
//!
//! [`JsonClient`] implements [`mailsync_core::Remote`] by posting form-encoded
//! actions to the `?/Json/` endpoint and decoding the response envelope.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod wire;

pub use client::{JsonClient, RemoteConfig};
pub use error::{Error, Result};
