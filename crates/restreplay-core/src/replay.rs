//! Builders for repetitive expectation runs: bulk gathers, retries and pages

use crate::queue::{Expectation, HarnessError};
use crate::response::RestResponse;

/// `count` wildcard expectations for `method`, all answering `response`.
///
/// Used when a caller iterates over many resource types and the paths
/// themselves are not under test.
#[must_use]
pub fn wildcard(method: &str, response: &RestResponse, count: usize) -> Vec<Expectation> {
    (0..count)
        .map(|_| Expectation::any(method, response))
        .collect()
}

/// `count` identical expectations, e.g. one per retry of a failing call.
#[must_use]
pub fn repeat(method: &str, path: &str, response: &RestResponse, count: usize) -> Vec<Expectation> {
    (0..count)
        .map(|_| Expectation::new(method, path, response))
        .collect()
}

/// Expectations for a paginated collection.
///
/// The first page is registered at `first_path`; each following page at the
/// path named by the previous page's `_links.next.href`.
///
/// # Errors
///
/// [`HarnessError::BrokenPagination`] when a page other than the last one
/// carries no next link.
pub fn paginated(
    method: &str,
    first_path: &str,
    pages: &[RestResponse],
) -> Result<Vec<Expectation>, HarnessError> {
    let mut expectations = Vec::with_capacity(pages.len());
    let mut path = first_path.to_string();
    for (page_index, page) in pages.iter().enumerate() {
        expectations.push(Expectation::new(method, path.as_str(), page));
        let left = pages.len() - page_index - 1;
        if left == 0 {
            break;
        }
        let Some(next) = page.envelope().and_then(|env| env.next_path()) else {
            return Err(HarnessError::BrokenPagination {
                path,
                page: page_index,
                left,
            });
        };
        path = next.to_string();
    }
    Ok(expectations)
}
