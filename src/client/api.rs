use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::authenticated::AuthenticatedClient;
use crate::client::notify::{Notifier, Toast};
use crate::client::options::RequestOptions;
use crate::client::LoadingGuard;
use crate::configuration::NotificationSettings;
use crate::error::ApiError;

/// Per-consumer request handle.
///
/// Calls never fail past this boundary: a failure resolves to `None`
/// and its message lands in `error()` (unless a custom error handler
/// takes over), so absence of data is the uniform failure signal.
pub struct ApiClient {
    client: Arc<AuthenticatedClient>,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationSettings,
    loading: AtomicUsize,
    error: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(
        client: Arc<AuthenticatedClient>,
        notifier: Arc<dyn Notifier>,
        notifications: NotificationSettings,
    ) -> Self {
        Self {
            client,
            notifier,
            notifications,
            loading: AtomicUsize::new(0),
            error: Mutex::new(None),
        }
    }

    pub fn loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Option<T> {
        self.make_request(Method::GET, path, None, options).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B, options: RequestOptions) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.with_body(Method::POST, path, body, options).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B, options: RequestOptions) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.with_body(Method::PUT, path, body, options).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B, options: RequestOptions) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.with_body(Method::PATCH, path, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Option<T> {
        self.make_request(Method::DELETE, path, None, options).await
    }

    async fn with_body<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Option<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match serde_json::to_value(body) {
            Ok(body) => self.make_request(method, path, Some(body), options).await,
            Err(e) => {
                self.fail(ApiError::from(e), &options);
                None
            }
        }
    }

    pub async fn make_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Option<T> {
        let _loading = LoadingGuard::start(&self.loading);
        self.set_error(None);

        let result = self
            .client
            .request(method, path, body, options.skip_auth)
            .await
            .and_then(|value| serde_json::from_value::<T>(value).map_err(ApiError::from));

        match result {
            Ok(data) => {
                if options.show_success_toast {
                    self.notifier.notify(Toast::success(
                        options.success_message.clone(),
                        self.notifications.success_life(),
                    ));
                }
                Some(data)
            }
            Err(e) => {
                self.fail(e, &options);
                None
            }
        }
    }

    fn fail(&self, error: ApiError, options: &RequestOptions) {
        if let Some(handler) = &options.error_handler {
            handler(&error);
            return;
        }

        let message = error.user_message();
        self.set_error(Some(message.clone()));
        // Session failures already redirected to sign-in.
        if options.show_error_toast && !error.is_session_failure() {
            self.notifier
                .notify(Toast::error(message, self.notifications.error_life()));
        }
    }

    fn set_error(&self, message: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }
}
