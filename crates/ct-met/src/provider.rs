//! The provider seam between the cache and the upstream service.

use ct_common::Result;

use crate::request::MetRequest;
use crate::sample::MetSample;

/// Source of gridded meteorology.
///
/// The production implementation is [`crate::CdsClient`]; tests substitute
/// synthetic providers to exercise cache idempotence and failure handling
/// without a network.
pub trait MetProvider {
    /// Human-readable provider name, recorded in cache entries.
    fn name(&self) -> &str;

    /// Fetch every sample satisfying the request.
    ///
    /// Implementations must return samples for the request's full
    /// time/space extent or fail with an `ExternalService`/`IncompleteData`
    /// error; partial coverage must never be returned silently.
    fn fetch(&self, request: &MetRequest) -> Result<Vec<MetSample>>;
}
