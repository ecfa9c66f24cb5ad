//! Username/password login form.

use std::fmt;

/// The form posted to the token endpoint to open a session.
///
/// Only the username shows up in `Debug`; the password is read back solely
/// by the login call.
///
/// ```
/// use authpipe_core::Credentials;
///
/// let form = Credentials::new("alice", "hunter2");
/// assert_eq!(form.username(), "alice");
/// assert!(!format!("{form:?}").contains("hunter2"));
/// ```
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials {{ username: {:?}, password: *** }}", self.username)
    }
}
