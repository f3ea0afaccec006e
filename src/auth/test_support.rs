// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token signing helpers and a mock Clerk JWKS endpoint for tests.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{JwksManager, TokenVerifier};

/// Private half of the key published in the mock JWKS.
const PROVIDER_KEY_PEM: &[u8] = include_bytes!("testdata/provider_key.pem");
/// A key that is never published.
const FOREIGN_KEY_PEM: &[u8] = include_bytes!("testdata/foreign_key.pem");

pub const PROVIDER_KID: &str = "ins_test_kid_1";
pub const PREVIOUS_KID: &str = "ins_test_kid_0";

const PROVIDER_N: &str = "2U2LfCO0YJEeSZLhltPa0Nm_p-9f3NEZILRSWijW2pljRJnBBOuhATKNDSdPDqiyp7Y1h9ozRpZmw5hw-XnK8IFsMquK5Baimpak3RaqB6rPKlSMSJkFp5pWDrW301ib4CqCk_3ptyhxO2tTp7VxFXLEuSNJPzFpz5QqsYHHINznU9a8StiGiwVC1ca8E_Z92FMmd2FcNUfBSVLsOrYJUXHS-PiqUkioyds9CD7UjXNnOpDzG0IZps_SJFtvUqPnpvOeLpMhevqBWO5tfJWNcN7ZLwFR8sFNrl6sN1GzTTXTzQjYH5kdt-S-AroXtrw_84XG8jqi4U1j2K753ZIeEQ";
const PREVIOUS_N: &str = "Z_wIBFqfPGYSZoXBgS15g3Qo0iin6LUEiI84xMNUlp6jHwOhX-7yjlMsFs-GG9IprWOhc_nT_OBLEf2V_Y6KVJq4MEbWmKEv1fWFI-GBblrfqvmFyxHMPIJVOJ_KUlEQ2C2n8PTcHT2dq42OqgaQZwdhiAovdzMReh1eOs1miVscGd9aSVAZ2oTin5x4appftskFLlj6PzoM0NONOn0CfUGTbhyGMF-nducWoRAT2pApdHJuIToD5SzCZdnmi1DCTWVxZInTyPhgzv3YLWT8xMwa5qdFLYMG8XMD8HHUIGBa8Ae5dq49Kd6DYyuIInFdUoUe0YeToDAfN3VTMtYTYw";

/// The JWKS document served by [`mock_jwks_server`].
pub fn jwks_document() -> Value {
    json!({
        "keys": [
            {"kty": "RSA", "use": "sig", "alg": "RS256", "kid": PROVIDER_KID,
             "n": PROVIDER_N, "e": "AQAB"},
            {"kty": "RSA", "use": "sig", "alg": "RS256", "kid": PREVIOUS_KID,
             "n": PREVIOUS_N, "e": "AQAB"}
        ]
    })
}

/// Start a server answering `GET /.well-known/jwks.json`.
pub async fn mock_jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document()))
        .mount(&server)
        .await;
    server
}

/// A verifier whose issuer/audience is the mock server URL.
pub fn verifier_for(server: &MockServer) -> TokenVerifier {
    let jwks = JwksManager::new(format!("{}/.well-known/jwks.json", server.uri())).unwrap();
    TokenVerifier::new(Arc::new(jwks), server.uri())
}

/// Claims Clerk would issue for `sub`, valid for an hour.
pub fn valid_claims(issuer: &str, sub: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": sub,
        "iss": issuer,
        "aud": issuer,
        "iat": now,
        "exp": now + 3600,
        "email": "candidate@example.com",
        "email_verified": true,
        "name": "Test Candidate"
    })
}

fn sign_with(pem: &[u8], kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
}

/// Sign with the published provider key.
pub fn sign(claims: &Value) -> String {
    sign_with(PROVIDER_KEY_PEM, Some(PROVIDER_KID), claims)
}

/// Sign with the provider key, custom `kid`.
pub fn sign_with_kid(kid: Option<&str>, claims: &Value) -> String {
    sign_with(PROVIDER_KEY_PEM, kid, claims)
}

/// Sign with a key that is not in the JWKS, using the given `kid`.
pub fn sign_foreign(kid: &str, claims: &Value) -> String {
    sign_with(FOREIGN_KEY_PEM, Some(kid), claims)
}
