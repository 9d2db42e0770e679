//! HTTP endpoints of the fortune server.
//!
//! - `GET|POST /fortune`: the paid resource, guarded by a [`PaymentGate`]
//! - `GET /health`: liveness check with the payment setup

use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors;
use tracing::instrument;
use url::Url;
use x402_paygate::paygate::{PAYMENT_REQUIRED, PAYMENT_RESPONSE};
use x402_paygate::{Facilitator, FacilitatorClient, PaymentGate};

use crate::fortune::FortuneTeller;

/// Shared state of the HTTP handlers.
pub struct AppState<F = FacilitatorClient> {
    pub gate: PaymentGate<F, FortuneTeller>,
    /// Reported by `/health`.
    pub facilitator_url: Url,
}

impl<F> AppState<F> {
    pub fn new(gate: PaymentGate<F, FortuneTeller>, facilitator_url: Url) -> Self {
        Self {
            gate,
            facilitator_url,
        }
    }
}

pub fn routes<F>() -> Router<Arc<AppState<F>>>
where
    F: Facilitator + Send + Sync + 'static,
{
    Router::new()
        .route("/fortune", get(fortune::<F>).post(fortune::<F>))
        .route("/health", get(get_health::<F>))
}

/// Routes with state and CORS applied. Browsers may read the x402 headers.
pub fn app<F>(state: Arc<AppState<F>>) -> Router
where
    F: Facilitator + Send + Sync + 'static,
{
    routes().with_state(state).layer(
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any)
            .expose_headers([PAYMENT_REQUIRED, PAYMENT_RESPONSE]),
    )
}

/// `GET|POST /fortune`: a fortune for a settled payment, a 402 challenge otherwise.
#[instrument(skip_all)]
pub async fn fortune<F>(
    State(state): State<Arc<AppState<F>>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response
where
    F: Facilitator + Send + Sync + 'static,
{
    state.gate.handle_request(&headers, &uri).await
}

/// `GET /health`
#[instrument(skip_all)]
pub async fn get_health<F>(State(state): State<Arc<AppState<F>>>) -> impl IntoResponse
where
    F: Facilitator + Send + Sync + 'static,
{
    let requirements = state.gate.requirements().requirements();
    Json(json!({
        "status": "ok",
        "facilitator": state.facilitator_url.as_str(),
        "network": requirements.network,
        "payTo": requirements.pay_to,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use x402_paygate::paygate::PAYMENT_SIGNATURE;
    use x402_paygate::{GateOptions, PriceTag, RequirementsBuilder};
    use x402_types::chain::ChainId;
    use x402_types::codec;
    use x402_types::networks::{KnownNetworkAptos, USDC};
    use x402_types::proto::v2::{OtherFields, X402Version2};
    use x402_types::scheme::aptos_exact::{ExactAptosPayload, PaymentPayload};
    use x402_types::util::TokenAmount;

    use crate::fortune::{FORTUNES, Fortune};

    const PAY_TO: &str = "0x00000000000000000000000000000000000000000000000000000000000000a1";

    fn requirements() -> RequirementsBuilder {
        RequirementsBuilder::try_new(PriceTag {
            network: ChainId::aptos_testnet(),
            asset: USDC::aptos_testnet().address.to_string(),
            amount: TokenAmount(10_000),
            pay_to: PAY_TO.to_string(),
            max_timeout_seconds: 600,
            sponsored: true,
        })
        .unwrap()
        .with_base_url("http://localhost:3000/".parse().unwrap())
    }

    fn app_for(facilitator_url: &str) -> Router {
        let facilitator = FacilitatorClient::try_from(facilitator_url)
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        let gate = PaymentGate::new(
            facilitator,
            FortuneTeller::with_seed(7),
            requirements(),
            GateOptions::default(),
        );
        app(Arc::new(AppState::new(
            gate,
            facilitator_url.parse().unwrap(),
        )))
    }

    fn payment_header() -> String {
        let payload = PaymentPayload {
            x402_version: X402Version2,
            resource: None,
            accepted: requirements().build(),
            payload: ExactAptosPayload::new("AAECAwQF"),
            extensions: None,
            other: OtherFields::new(),
        };
        codec::encode_header(&payload).unwrap()
    }

    fn fortune_request(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/fortune");
        if let Some(header) = header {
            builder = builder.header(PAYMENT_SIGNATURE, header);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_no_payment_gets_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let response = app_for(&server.uri())
            .oneshot(fortune_request(None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let header = response.headers().get(PAYMENT_REQUIRED).unwrap().clone();
        let challenge = codec::decode_challenge(header.as_bytes()).unwrap();
        assert_eq!(challenge.accepts.len(), 1);
        let accepted = &challenge.accepts[0];
        assert_eq!(accepted.network.to_string(), "aptos:2");
        assert_eq!(accepted.amount, TokenAmount(10_000));
        assert_eq!(
            accepted.asset,
            "0x69091fbab5f7d635ee7ac5098cf0c1efbe31d68fec0f2cd565e8d168daf52832"
        );
        assert_eq!(accepted.pay_to, PAY_TO);
        assert_eq!(challenge.resource.url, "http://localhost:3000/fortune");

        let raw: Value = codec::decode_header(header.as_bytes()).unwrap();
        assert_eq!(raw["x402Version"], 2);
        assert_eq!(raw["accepts"][0]["scheme"], "exact");
        assert_eq!(raw["accepts"][0]["amount"], "10000");

        let body = body_json(response).await;
        assert_eq!(body["x402Version"], 2);
    }

    #[tokio::test]
    async fn test_invalid_payment_never_settles() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": false,
                "invalidReason": "insufficient funds",
                "payer": "0xb0b"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let header = payment_header();
        let response = app_for(&server.uri())
            .oneshot(fortune_request(Some(&header)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert!(response.headers().contains_key(PAYMENT_REQUIRED));
        assert!(!response.headers().contains_key(PAYMENT_RESPONSE));
        let body = body_json(response).await;
        assert_eq!(body["reason"], "insufficient funds");
    }

    #[tokio::test]
    async fn test_settled_payment_gets_fortune() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": true,
                "payer": "0xb0b"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "transaction": "0xabc",
                "network": "aptos:2",
                "payer": "0xb0b"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let header = payment_header();
        let response = app_for(&server.uri())
            .oneshot(fortune_request(Some(&header)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let receipt: Value =
            codec::decode_header(response.headers().get(PAYMENT_RESPONSE).unwrap().as_bytes())
                .unwrap();
        assert_eq!(receipt["success"], true);
        assert_eq!(receipt["transaction"], "0xabc");
        assert_eq!(receipt["network"], "aptos:2");
        assert_eq!(receipt["payer"], "0xb0b");

        let body = body_json(response).await;
        assert_eq!(body["transaction"], "0xabc");
        let fortune: Fortune = serde_json::from_value(body).unwrap();
        assert!(FORTUNES.contains(&fortune.fortune.as_str()));
    }

    #[tokio::test]
    async fn test_unreachable_facilitator_is_bad_gateway() {
        // Nothing listens on the discard port.
        let response = app_for("http://127.0.0.1:9/")
            .oneshot(fortune_request(Some(&payment_header())))
            .await
            .unwrap();
        assert!(response.status().is_server_error());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(!response.headers().contains_key(PAYMENT_RESPONSE));
        let body = body_json(response).await;
        assert_eq!(body["error"], "Facilitator unavailable");
    }

    #[tokio::test]
    async fn test_malformed_header_skips_facilitator() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = app_for(&server.uri())
            .oneshot(fortune_request(Some("%%%not-base64%%%")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid payment payload");
    }

    #[tokio::test]
    async fn test_get_fortune_is_gated_too() {
        let request = Request::builder()
            .uri("/fortune")
            .body(Body::empty())
            .unwrap();
        let response = app_for("http://127.0.0.1:9/").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app_for("http://127.0.0.1:9/").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["network"], "aptos:2");
        assert_eq!(body["payTo"], PAY_TO);
        assert_eq!(body["facilitator"], "http://127.0.0.1:9/");
    }

    #[tokio::test]
    async fn test_cors_exposes_payment_headers() {
        let request = Request::builder()
            .uri("/fortune")
            .header("origin", "https://wallet.example.com")
            .body(Body::empty())
            .unwrap();
        let response = app_for("http://127.0.0.1:9/").oneshot(request).await.unwrap();
        let exposed = response
            .headers()
            .get("access-control-expose-headers")
            .unwrap()
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(exposed.contains("payment-required"));
        assert!(exposed.contains("payment-response"));
    }
}
