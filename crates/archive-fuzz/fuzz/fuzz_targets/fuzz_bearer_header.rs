#![no_main]

use archive_auth::server::oauth::extract_bearer_token;
use axum::http::{HeaderMap, HeaderValue, header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = HeaderValue::from_bytes(data) else {
        return;
    };
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, value);

    if let Ok(token) = extract_bearer_token(&headers) {
        assert!(!token.contains(' '));
    }
});
