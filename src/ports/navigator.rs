/// Location of the login view.
pub const LOGIN_PATH: &str = "/login";
/// Location of the role-mismatch view.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Navigator is the port through which the client layer redirects the user.
pub trait Navigator: Send + Sync + 'static {
    /// Move to `location`, replacing whatever is currently shown.
    fn navigate(&self, location: &str);

    /// The location most recently navigated to, if any.
    fn current(&self) -> Option<String>;
}
