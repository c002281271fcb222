//! restreplay-core: deterministic REST call replay for tests
//!
//! A [`ResponseCatalog`] names canned responses once per test module; an
//! [`ExpectationQueue`] lists, per test case, the calls the code under test
//! must make and the responses it gets back. The queue implements
//! [`Transport`], so it drops in wherever the live HTTP transport would.

pub mod catalog;
pub mod envelope;
pub mod fixture;
pub mod queue;
pub mod replay;
pub mod response;
pub mod schema;
pub mod transport;

pub use catalog::{CatalogBuilder, CatalogError, ResponseCatalog};
pub use envelope::{Envelope, Version, strip_api_prefix};
pub use fixture::{CallSpec, FixtureError, FixtureFile, FixtureFormat, Scenario};
pub use queue::{Expectation, ExpectationQueue, HarnessError, PathPattern, RecordedCall, WILDCARD};
pub use response::{ErrorPayload, RestResponse};
pub use transport::{Request, Transport};
