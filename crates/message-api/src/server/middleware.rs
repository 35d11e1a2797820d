//! Settings for the middleware layers applied by the router.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single database call made by a handler.
///
/// Must stay below [`REQUEST_TIMEOUT`] so a stalled database ends in the
/// handler's logged `5xx` and never in the timeout layer's `408`.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(20);
