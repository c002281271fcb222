//! restreplay-client: REST calls over a pluggable transport
//!
//! [`RestClient`] is generic over [`restreplay_core::Transport`]. Wire in an
//! [`HttpTransport`] to talk to a live endpoint, or an
//! [`ExpectationQueue`](restreplay_core::ExpectationQueue) to replay a
//! scripted call sequence in tests.

mod client;
mod error;
mod http;
mod warnings;

pub use client::{DEFAULT_JOB_ATTEMPTS, DEFAULT_MAX_POLLS, Records, RestClient};
pub use error::ClientError;
pub use http::{HttpConfig, HttpError, HttpTransport};
pub use warnings::Warnings;
