//! Helpers around Mattermost's use of OAuth Bearer Authentication.

/// A newtype wrapper around Mattermost personal access or bot tokens.
#[derive(Clone)]
pub struct MattermostToken(pub String);

/// Convert a Mattermost token to a `Bearer` `Authorization` header value.
///
/// ```
/// use jupyterpost::mattermost::auth::{to_auth_header_val, MattermostToken};
///
/// let token = MattermostToken("xyzpdq".into());
/// assert_eq!(to_auth_header_val(&token), "Bearer xyzpdq");
/// ```
pub fn to_auth_header_val(t: &MattermostToken) -> String {
    format!("Bearer {}", t.0)
}
