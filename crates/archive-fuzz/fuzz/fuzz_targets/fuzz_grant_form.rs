#![no_main]

use archive_auth::server::oauth::handlers::TokenRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try to parse arbitrary bytes as a token request form
    let _ = serde_urlencoded::from_bytes::<TokenRequest>(data);
});
