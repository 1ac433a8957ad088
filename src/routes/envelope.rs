use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Success side of the response envelope. Failures render through
/// [`AppError`](crate::error::AppError).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<&'static str>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
            redirect_to: None,
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_redirect(mut self, path: &'static str) -> Self {
        self.redirect_to = Some(path);
        self
    }
}

impl<T> Envelope<Vec<T>> {
    /// List payload alongside its length.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            count: Some(count),
            ..Self::data(items)
        }
    }
}

impl Envelope<()> {
    pub fn message(message: &'static str) -> Self {
        Self {
            success: true,
            message: Some(message),
            count: None,
            data: None,
            redirect_to: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
