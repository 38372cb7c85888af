use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

fn json_response<T: Serialize>(body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            json,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        json_response(&self)
    }
}

/// Wrap `data` and report the unpaginated size in `X-Total-Count`.
pub fn with_total_count<T: Serialize>(data: T, count: i64) -> Response {
    let mut response = json_response(&ApiResponse { data });
    if response.status() == StatusCode::OK {
        response
            .headers_mut()
            .insert("X-Total-Count", HeaderValue::from(count));
    }
    response
}
