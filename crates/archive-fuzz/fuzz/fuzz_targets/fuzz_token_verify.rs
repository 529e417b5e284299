#![no_main]

use archive_auth::TokenCodec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    // Neither step may panic, and nothing random may verify
    let _ = TokenCodec::peek_client_id(token);
    assert!(TokenCodec::decode_and_verify(token, "fuzz-secret").is_err());
});
