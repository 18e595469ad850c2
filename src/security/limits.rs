//! Request body limits.
//!
//! # Responsibilities
//! - Reject bodies larger than `security.max_body_size` with 413
//!
//! # Design Decisions
//! - A declared `Content-Length` over the limit is rejected before reading
//! - Bodies without a length are read up to the limit and then cut off

use axum::body::{to_bytes, Body, Bytes};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;

use crate::error::HttpError;

/// Declared content length, if present and parseable.
pub fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Buffer `body`, failing with `PayloadTooLarge` past `limit` bytes.
pub async fn read_limited(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, HttpError> {
    let too_large = || HttpError::PayloadTooLarge(format!("Request body exceeds {limit} bytes"));

    if declared_length(headers).is_some_and(|len| len > limit) {
        return Err(too_large());
    }
    // Over-limit streams are the only read failure we expect here.
    to_bytes(body, limit).await.map_err(|_| too_large())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_within_limit() {
        let bytes = read_limited(&HeaderMap::new(), Body::from("hello"), 10).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_declared_length_rejected_early() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4096"));
        let err = read_limited(&headers, Body::empty(), 1024).await.unwrap_err();
        assert!(matches!(err, HttpError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_undeclared_stream_cut_off() {
        let err = read_limited(&HeaderMap::new(), Body::from(vec![b'x'; 64]), 16)
            .await
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 413);
    }
}
