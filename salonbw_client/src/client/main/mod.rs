mod api_client;
mod executor;
mod headers;
mod response;
mod url;

pub use api_client::ApiClient;
pub use headers::{CorrelationHeader, CsrfHeader, HeaderInjector};

pub(crate) use executor::RequestExecutor;
pub(crate) use url::normalize_base_url;
