use std::sync::Arc;

use crate::error::ApiError;

/// Replaces the default error path (error state + toast) when set
pub type ErrorHandler = Arc<dyn Fn(&ApiError) + Send + Sync>;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Operation completed successfully";

/// Per-call switches for `ApiClient` requests
#[derive(Clone)]
pub struct RequestOptions {
    pub show_success_toast: bool,
    pub success_message: String,
    pub show_error_toast: bool,
    pub skip_auth: bool,
    pub error_handler: Option<ErrorHandler>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            show_success_toast: false,
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            show_error_toast: true,
            skip_auth: false,
            error_handler: None,
        }
    }
}

impl RequestOptions {
    pub fn success_toast(mut self, message: impl Into<String>) -> Self {
        self.show_success_toast = true;
        self.success_message = message.into();
        self
    }

    pub fn quiet(mut self) -> Self {
        self.show_error_toast = false;
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("show_success_toast", &self.show_success_toast)
            .field("success_message", &self.success_message)
            .field("show_error_toast", &self.show_error_toast)
            .field("skip_auth", &self.skip_auth)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}
