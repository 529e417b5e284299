//! Property-based tests for token verification and header parsing.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use proptest::prelude::*;

use archive_auth::credentials::MemoryCredentialStore;
use archive_auth::server::oauth::{BearerGate, extract_bearer_token};
use archive_auth::{
    ClientCredentials, CredentialStore, ManualClock, OAuthError, TokenCodec, TokenError,
};

const NOW: i64 = 1_700_000_000;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// A gate with one registered client, plus a valid token for that client.
fn gate_with_token(public_id: &str, secret: &str) -> (tokio::runtime::Runtime, BearerGate, String) {
    let rt = runtime();
    let codec = TokenCodec::new(Arc::new(ManualClock::new(NOW)));
    let store = Arc::new(MemoryCredentialStore::new());
    let creds = ClientCredentials {
        public_id: public_id.to_owned(),
        secret: secret.to_owned(),
    };
    rt.block_on(store.insert(&creds)).unwrap();

    let token = codec.encode(public_id, secret, 3600).unwrap();
    (rt, BearerGate::new(store, codec), token)
}

proptest! {
    /// A token issued for a client always verifies back to that client.
    #[test]
    fn issued_token_verifies(
        public_id in "[0-9a-f]{32}",
        secret in "[0-9a-f]{64}",
        lifetime in 0i64..100_000,
    ) {
        let rt = runtime();
        let codec = TokenCodec::new(Arc::new(ManualClock::new(NOW)));
        let token = codec.encode(&public_id, &secret, lifetime).unwrap();

        prop_assert_eq!(TokenCodec::peek_client_id(&token).unwrap(), public_id.clone());
        let claims = TokenCodec::decode_and_verify(&token, &secret).unwrap();
        prop_assert_eq!(claims.expires_at, NOW + lifetime);

        let store = Arc::new(MemoryCredentialStore::new());
        let client = rt
            .block_on(store.insert(&ClientCredentials { public_id, secret }))
            .unwrap();
        let ctx = rt.block_on(BearerGate::new(store, codec).verify(&token)).unwrap();
        prop_assert_eq!(ctx.client_id, client.client_id);
    }

    /// Flipping bits in any signature byte invalidates the token.
    #[test]
    fn flipped_signature_byte_is_rejected(index in 0usize..32, mask in 1u8..=255) {
        let (rt, gate, token) = gate_with_token("client-a", "secret-a");
        let parts: Vec<&str> = token.split('.').collect();

        let mut signature = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        signature[index] ^= mask;
        let tampered = format!("{}.{}.{}", parts[0], parts[1], URL_SAFE_NO_PAD.encode(&signature));

        let err = rt.block_on(gate.verify(&tampered)).unwrap_err();
        prop_assert!(matches!(err, TokenError::InvalidSignature), "got {:?}", err);
        prop_assert_eq!(OAuthError::from(err), OAuthError::InvalidToken);
    }

    /// Flipping bits in any payload byte invalidates the token.
    #[test]
    fn flipped_payload_byte_is_rejected(seed in any::<prop::sample::Index>(), mask in 1u8..=255) {
        let (rt, gate, token) = gate_with_token("client-a", "secret-a");
        let parts: Vec<&str> = token.split('.').collect();

        let mut payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let index = seed.index(payload.len());
        payload[index] ^= mask;
        let tampered = format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(&payload), parts[2]);

        let err = rt.block_on(gate.verify(&tampered)).unwrap_err();
        prop_assert!(err.is_client_error(), "got {:?}", err);
    }

    /// Arbitrary strings never authenticate and never cause a server error.
    #[test]
    fn arbitrary_token_is_invalid(token in "\\PC{0,200}") {
        let (rt, gate, _) = gate_with_token("client-a", "secret-a");
        let err = rt.block_on(gate.verify(&token)).unwrap_err();
        prop_assert!(err.is_client_error(), "got {:?}", err);
    }

    /// Header parsing is total: any visible-ASCII header is missing, invalid, or a token.
    #[test]
    fn arbitrary_authorization_header(value in "[ -~]{0,120}") {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());

        match extract_bearer_token(&headers) {
            Ok(token) => {
                prop_assert!(value.to_ascii_lowercase().starts_with("bearer "));
                prop_assert!(!token.contains(' '));
            }
            Err(OAuthError::MissingToken) => prop_assert!(value.is_empty()),
            Err(e) => prop_assert_eq!(e, OAuthError::InvalidToken),
        }
    }
}
