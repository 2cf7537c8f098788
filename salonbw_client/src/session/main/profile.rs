use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::config::PROFILE_PATH;
use crate::session::types::User;

/// `GET /users/profile`. A 401 here may still be refreshed, but it never logs
/// the session out: the caller decides what a failure means.
pub(super) async fn fetch_profile(client: &ApiClient) -> Result<User, ApiError> {
    let options = RequestOptions::get()
        .skip_logout()
        .header("cache-control", "no-store")?;

    client
        .request::<User>(PROFILE_PATH, options)
        .await?
        .into_json()
}
