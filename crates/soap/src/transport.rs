//! Authenticated HTTP transport for SOAP calls.

use std::time::Duration;

use hera::{Credential, Endpoint, RemoteError, RemoteErrorKind};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::envelope::SoapVersion;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings applied to every transport a binder creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accept self-signed or otherwise invalid TLS certificates. Appliances
    /// usually ship with a self-signed admin certificate.
    pub accept_invalid_certs: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

/// Raw HTTP outcome handed to the response decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, decoded as text. Empty when the server sent none.
    pub body: String,
}

impl RawResponse {
    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport with basic authentication.
///
/// One instance belongs to exactly one binding.
pub struct HttpAuthenticated {
    client: reqwest::Client,
    username: String,
    password: SecretString,
}

impl std::fmt::Debug for HttpAuthenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuthenticated")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HttpAuthenticated {
    /// Builds a fresh transport for `credential`.
    pub fn new(credential: &Credential, options: &TransportOptions) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            username: credential.username().to_string(),
            password: SecretString::new(credential.password().to_string()),
        })
    }

    /// Posts `envelope` to `endpoint`.
    ///
    /// Returns the body for 2xx responses and for 500 responses (which carry
    /// SOAP faults). 401/403 map to [`RemoteErrorKind::Authentication`];
    /// connection failures and any other status map to
    /// [`RemoteErrorKind::Transport`].
    pub async fn post(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        version: SoapVersion,
        action: &str,
        envelope: String,
    ) -> Result<RawResponse, RemoteError> {
        let transport_error =
            |detail: String| RemoteError::new(operation, RemoteErrorKind::Transport, detail);

        let mut request = self
            .client
            .post(endpoint.as_str())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(CONTENT_TYPE, version.content_type(action))
            .body(envelope);
        if let Some(soap_action) = version.soap_action_header(action) {
            request = request.header("SOAPAction", soap_action);
        }

        debug!(operation, endpoint = %endpoint, "Sending SOAP request");
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(operation, status = status.as_u16(), "Appliance rejected the credential");
            return Err(RemoteError::new(
                operation,
                RemoteErrorKind::Authentication {
                    status: status.as_u16(),
                },
                format!("HTTP {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(format!("failed to read response body: {e}")))?;

        if status.is_success() || status == StatusCode::INTERNAL_SERVER_ERROR {
            Ok(RawResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(transport_error(format!("HTTP {status}")))
        }
    }
}
