//! The "perform one HTTP call" seam
//!
//! Code under test is generic over [`Transport`]; production wires in a live
//! HTTP implementation, tests wire in an [`ExpectationQueue`](crate::ExpectationQueue).

use serde_json::Value;

use crate::response::RestResponse;

/// One outgoing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request<'a> {
    pub method: &'a str,
    /// Path relative to the API root, e.g. `storage/volumes`
    pub path: &'a str,
    /// Query parameters
    pub params: &'a [(String, String)],
    pub body: Option<&'a Value>,
}

impl<'a> Request<'a> {
    #[must_use]
    pub const fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            path,
            params: &[],
            body: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: &'a [(String, String)]) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `"GET storage/volumes"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Perform one call. Error-bearing responses are `Ok`; `Err` is reserved
    /// for failures of the transport itself.
    ///
    /// # Errors
    ///
    /// Implementation-defined transport failure.
    fn send(&mut self, request: &Request<'_>) -> Result<RestResponse, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn send(&mut self, request: &Request<'_>) -> Result<RestResponse, Self::Error> {
        (**self).send(request)
    }
}
