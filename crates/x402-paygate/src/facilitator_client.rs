//! A [`Facilitator`] implementation that talks to a _remote_ x402 facilitator over HTTP.
//!
//! [`FacilitatorClient`] posts JSON to the `/verify` and `/settle` endpoints of
//! the facilitator and decodes the typed results.
//!
//! ## Example
//!
//! ```rust
//! use x402_paygate::facilitator_client::FacilitatorClient;
//!
//! let facilitator = FacilitatorClient::try_from("https://facilitator.x402.rs").unwrap();
//! assert_eq!(facilitator.verify_url().as_str(), "https://facilitator.x402.rs/verify");
//! ```
//!
//! ## Error Handling
//!
//! [`FacilitatorClientError`] captures the context of a failed call:
//! - URL construction
//! - HTTP transport failures (including timeouts)
//! - JSON deserialization errors
//! - Unexpected HTTP status responses
//!
//! A facilitator that answers `isValid: false` or `success: false` has not
//! failed; those answers come back as `Ok`.

use http::{HeaderMap, StatusCode};
use reqwest::Client;
use std::fmt::Display;
use std::time::Duration;
use tracing::{Instrument, Span};
use url::Url;
use x402_types::proto::{SettleResponse, VerifyResponse};
use x402_types::scheme::aptos_exact::{SettleRequest, VerifyRequest};

use crate::facilitator::Facilitator;

/// A client for communicating with a remote x402 facilitator.
#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    /// Base URL of the facilitator (e.g. `https://facilitator.example/`)
    base_url: Url,
    /// Full URL to `POST /verify` requests
    verify_url: Url,
    /// Full URL to `POST /settle` requests
    settle_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Optional custom headers sent with each request
    headers: HeaderMap,
    /// Optional request timeout
    timeout: Option<Duration>,
}

impl Facilitator for FacilitatorClient {
    type Error = FacilitatorClientError;

    async fn verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        FacilitatorClient::verify(self, request)
            .instrument(tracing::info_span!(
                "x402.facilitator_client.verify",
                timeout = ?self.timeout,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            ))
            .await
    }

    async fn settle(
        &self,
        request: &SettleRequest,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        FacilitatorClient::settle(self, request)
            .instrument(tracing::info_span!(
                "x402.facilitator_client.settle",
                timeout = ?self.timeout,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            ))
            .await
    }
}

/// Errors that can occur while interacting with a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl FacilitatorClient {
    /// Returns the base URL used by this client.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the computed `./verify` URL relative to [`FacilitatorClient::base_url`].
    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// Returns the computed `./settle` URL relative to [`FacilitatorClient::base_url`].
    pub fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// Returns any custom headers configured on the client.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the configured timeout, if any.
    pub fn timeout(&self) -> &Option<Duration> {
        &self.timeout
    }

    /// Constructs a new [`FacilitatorClient`] from a base URL.
    ///
    /// This sets up `./verify` and `./settle` endpoint URLs relative to the base.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let client = Client::new();
        let verify_url =
            base_url
                .join("./verify")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./verify URL",
                    source: e,
                })?;
        let settle_url =
            base_url
                .join("./settle")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./settle URL",
                    source: e,
                })?;
        Ok(Self {
            client,
            base_url,
            verify_url,
            settle_url,
            headers: HeaderMap::new(),
            timeout: None,
        })
    }

    /// Attaches custom headers to all future requests.
    pub fn with_headers(&self, headers: HeaderMap) -> Self {
        let mut this = self.clone();
        this.headers = headers;
        this
    }

    /// Sets a timeout for all future requests.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    /// Sends a `POST /verify` request to the facilitator.
    pub async fn verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        self.post_json(&self.verify_url, "POST /verify", request)
            .await
    }

    /// Sends a `POST /settle` request to the facilitator.
    pub async fn settle(
        &self,
        request: &SettleRequest,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        self.post_json(&self.settle_url, "POST /settle", request)
            .await
    }

    /// Generic POST helper that handles JSON serialization, error mapping,
    /// timeout application, and span bookkeeping.
    ///
    /// `context` is a human-readable identifier used in tracing and error messages (e.g. `"POST /verify"`).
    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, FacilitatorClientError>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.post(url.clone()).json(payload);
        for (key, value) in self.headers.iter() {
            req = req.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let result = match req.send().await {
            Err(e) => Err(FacilitatorClientError::Http { context, source: e }),
            Ok(http_response) if http_response.status() == StatusCode::OK => http_response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e }),
            Ok(http_response) => {
                let status = http_response.status();
                match http_response.text().await {
                    Ok(body) => Err(FacilitatorClientError::HttpStatus {
                        context,
                        status,
                        body,
                    }),
                    Err(e) => Err(FacilitatorClientError::ResponseBodyRead { context, source: e }),
                }
            }
        };

        record_result_on_span(&result);

        result
    }
}

/// Converts a string URL into a `FacilitatorClient`, parsing the URL and calling `try_new`.
impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Exactly one trailing slash, so that `./verify` joins below the base path
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        FacilitatorClient::try_new(url)
    }
}

/// Converts a String URL into a `FacilitatorClient`.
impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FacilitatorClient::try_from(value.as_str())
    }
}

/// Records the outcome of a request on the current span, including status and errors.
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to facilitator failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use x402_types::chain::ChainId;
    use x402_types::proto::v2::{OtherFields, X402Version2};
    use x402_types::scheme::aptos_exact::{
        AptosExtra, ExactAptosPayload, ExactScheme, PaymentPayload, PaymentRequirements,
    };
    use x402_types::util::TokenAmount;

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: ExactScheme,
            network: ChainId::new("aptos", "2"),
            amount: TokenAmount(10_000),
            pay_to: "0x1".into(),
            max_timeout_seconds: 600,
            asset: "0xa".into(),
            extra: AptosExtra::sponsored(true),
            other: OtherFields::new(),
        }
    }

    fn verify_request() -> VerifyRequest {
        let payload = PaymentPayload {
            x402_version: X402Version2,
            resource: None,
            accepted: requirements(),
            payload: ExactAptosPayload::new("AAEC"),
            extensions: None,
            other: OtherFields::new(),
        };
        VerifyRequest::new(payload, requirements())
    }

    async fn client_for(server: &MockServer) -> FacilitatorClient {
        FacilitatorClient::try_from(server.uri().as_str()).unwrap()
    }

    #[test]
    fn test_try_from_normalizes_trailing_slash() {
        let client = FacilitatorClient::try_from("https://example.com/facilitator///").unwrap();
        assert_eq!(client.base_url().as_str(), "https://example.com/facilitator/");
        assert_eq!(
            client.verify_url().as_str(),
            "https://example.com/facilitator/verify"
        );
        assert_eq!(
            client.settle_url().as_str(),
            "https://example.com/facilitator/settle"
        );
    }

    #[test]
    fn test_try_from_rejects_garbage() {
        assert!(matches!(
            FacilitatorClient::try_from("not a url"),
            Err(FacilitatorClientError::UrlParse { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_posts_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_partial_json(json!({
                "x402Version": 2,
                "paymentPayload": {"payload": {"transaction": "AAEC"}},
                "paymentRequirements": {"amount": "10000", "network": "aptos:2"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"isValid": true, "payer": "0xp"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = Facilitator::verify(&client, &verify_request()).await.unwrap();
        assert_eq!(response, VerifyResponse::valid(Some("0xp".into())));
    }

    #[tokio::test]
    async fn test_verify_invalid_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"isValid": false, "invalidReason": "insufficient_funds"}),
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client.verify(&verify_request()).await.unwrap();
        assert_eq!(response, VerifyResponse::invalid(None, "insufficient_funds"));
    }

    #[tokio::test]
    async fn test_settle_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "transaction": "0xdeadbeef",
                "network": "aptos:2"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = Facilitator::settle(&client, &verify_request()).await.unwrap();
        assert_eq!(
            response,
            SettleResponse::Success {
                transaction: "0xdeadbeef".into(),
                payer: None,
                network: Some("aptos:2".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_non_200_is_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.settle(&verify_request()).await.unwrap_err();
        match err {
            FacilitatorClientError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_deserialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.settle(&verify_request()).await.unwrap_err();
        assert!(matches!(
            err,
            FacilitatorClientError::JsonDeserialization { .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"isValid": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server)
            .await
            .with_timeout(Duration::from_millis(50));
        let err = client.verify(&verify_request()).await.unwrap_err();
        assert!(matches!(err, FacilitatorClientError::Http { .. }));
    }

    #[tokio::test]
    async fn test_custom_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"isValid": true})))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer token".parse().unwrap());
        let client = client_for(&server).await.with_headers(headers);
        assert!(client.verify(&verify_request()).await.unwrap().is_valid());
    }
}
