mod errors;
mod main;
mod types;

pub use errors::ApiError;
pub use main::{ApiClient, CorrelationHeader, CsrfHeader, HeaderInjector};
pub use types::{ApiRequest, Payload, RequestOptions, SKIP_LOGOUT_HEADER, SessionExpiryHandler};

pub(crate) use main::{RequestExecutor, normalize_base_url};
