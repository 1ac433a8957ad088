use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections render through the error envelope instead of
/// axum's plain-text body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
