//! Application-only bearer token exchange
//!
//! POSTs the consumer key and secret as HTTP basic credentials with
//! `grant_type=client_credentials`. The returned bearer token authorizes
//! search and rate-limit requests on behalf of the application; it does not
//! expire, so one exchange per credential per pool pass is enough.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

use crate::constants::Endpoints;
use crate::error::{Error, Result, status_error};

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct BearerToken {
    /// Always "bearer" for application-only auth
    pub token_type: String,
    pub access_token: String,
}

/// Encode a consumer key/secret pair for the `Authorization: Basic` header.
///
/// Each part is percent-encoded before joining, so reserved characters in a
/// key or secret reach the token endpoint intact.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    let id: String = byte_serialize(client_id.as_bytes()).collect();
    let secret: String = byte_serialize(client_secret.as_bytes()).collect();
    STANDARD.encode(format!("{id}:{secret}"))
}

/// Exchange a consumer key/secret for an application-only bearer token.
///
/// 401/403 from the token endpoint means the pair is wrong or revoked and is
/// reported as `InvalidCredentials`.
pub async fn obtain_bearer_token(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: &str,
) -> Result<BearerToken> {
    let response = client
        .post(&endpoints.token)
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Basic {}", basic_credentials(client_id, client_secret)),
        )
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let err = status_error(response).await;
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "token endpoint rejected client {client_id}: {err}"
            )));
        }
        return Err(err);
    }

    let token = response
        .json::<BearerToken>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;

    if !token.token_type.eq_ignore_ascii_case("bearer") {
        return Err(Error::TokenExchange(format!(
            "unexpected token type '{}'",
            token.token_type
        )));
    }

    debug!(client_id, "obtained bearer token");
    Ok(token)
}
