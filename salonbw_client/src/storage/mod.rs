mod cookie_jar;
mod durable;
mod errors;
mod token_store;
mod types;

pub use cookie_jar::CookieJar;
pub use durable::{DurableStore, FileStore, InMemoryStore};
pub use errors::StorageError;
pub use token_store::TokenStore;
pub(crate) use cookie_jar::domain_matches;
pub use types::{ACCESS_TOKEN_KEY, CookieScope, CredentialPair, DEBUG_API_KEY, REFRESH_TOKEN_KEY};
