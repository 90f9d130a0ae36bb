//! Session negotiation and chunk PUTs for the resumable upload protocol.
//!
//! [`TransportAdapter`] translates raw HTTP exchanges into
//! [`PutOutcome`]s. The HTTP layer itself sits behind [`HttpClient`]; the
//! production implementation is [`ReqwestClient`].

pub mod adapter;
pub mod client;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use adapter::{PutOutcome, SessionHandle, TransportAdapter};
pub use client::ReqwestClient;
pub use error::{SessionError, TransportError};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method};
