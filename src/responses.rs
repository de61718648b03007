// ==============================================================================
// responses.rs - Authentication Response Contract
// ==============================================================================
// Description: Fixed JSON responses for login, logout and the auth entry point
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Content type shared by every JSON body the gate writes
pub const JSON_UTF8: &str = "application/json; charset=UTF-8";

pub const LOGIN_SUCCESS_MESSAGE: &str = "login success";
pub const BAD_CREDENTIALS_MESSAGE: &str = "email or password is incorrect";
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized";

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    // Serializing a struct of string slices cannot fail
    let bytes = serde_json::to_vec(body).unwrap_or_default();

    let mut response = (status, Body::from(bytes)).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    response
}

/// 200 `{"message":"login success"}`
pub fn login_success() -> Response {
    json(StatusCode::OK, &MessageBody { message: LOGIN_SUCCESS_MESSAGE })
}

/// 401 `{"error":"email or password is incorrect"}`
///
/// Used for every login failure, whatever the cause.
pub fn login_failure() -> Response {
    json(StatusCode::UNAUTHORIZED, &ErrorBody { error: BAD_CREDENTIALS_MESSAGE })
}

/// 401 `{"error":"unauthorized"}`, the single authentication entry point
pub fn unauthorized() -> Response {
    json(StatusCode::UNAUTHORIZED, &ErrorBody { error: UNAUTHORIZED_MESSAGE })
}

/// 200 with an empty body
pub fn logout_success() -> Response {
    StatusCode::OK.into_response()
}

pub fn internal_error() -> Response {
    json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorBody { error: "internal server error" },
    )
}

pub fn not_found() -> Response {
    json(StatusCode::NOT_FOUND, &ErrorBody { error: "not found" })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_shape() {
        let response = unauthorized();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(content_type(&response), "application/json; charset=UTF-8");
        assert_eq!(body_string(response).await, r#"{"error":"unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_login_success_shape() {
        let response = login_success();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), JSON_UTF8);
        assert_eq!(body_string(response).await, r#"{"message":"login success"}"#);
    }

    #[tokio::test]
    async fn test_login_failure_shape() {
        let response = login_failure();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(content_type(&response), JSON_UTF8);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"email or password is incorrect"}"#
        );
    }

    #[tokio::test]
    async fn test_logout_has_no_body() {
        let response = logout_success();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.is_empty());
    }
}
