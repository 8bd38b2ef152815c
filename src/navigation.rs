/// Port to the view layer: where teardown sends the user.
pub trait Navigator: Send + Sync {
    /// Leave the current view for the sign-in surface. `return_to` is
    /// the destination to resume after signing in, when known.
    fn redirect_to_sign_in(&self, sign_in_path: &str, return_to: Option<&str>);
}

/// Navigator for headless use: records the redirect in the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_sign_in(&self, sign_in_path: &str, return_to: Option<&str>) {
        tracing::info!(
            sign_in_path = sign_in_path,
            return_to = return_to.unwrap_or(""),
            "Redirecting to sign-in"
        );
    }
}
