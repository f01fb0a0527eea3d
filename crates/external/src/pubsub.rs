//! Publishes alert payloads to a Google Cloud Pub/Sub topic over REST.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use guardian_core::config::AppConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ensure_success, ExternalError};

const SERVICE: &str = "pubsub";
const PUBLISH_TIMEOUT_SECS: u64 = 10;

pub struct PubSubPublisher {
    client: reqwest::Client,
    endpoint: String,
    topic_path: String,
    access_token: Option<SecretString>,
}

impl PubSubPublisher {
    pub fn new(
        endpoint: impl Into<String>,
        topic_path: impl Into<String>,
        access_token: Option<SecretString>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PUBLISH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            topic_path: topic_path.into(),
            access_token,
        }
    }

    /// `None` when no topic is configured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let topic_path = config.pubsub_topic_path()?;
        Some(Self::new(
            config.alerting.pubsub_endpoint.clone(),
            topic_path,
            config.alerting.pubsub_access_token.clone(),
        ))
    }

    pub fn topic_path(&self) -> &str {
        &self.topic_path
    }

    /// Publishes one JSON message and returns the server-assigned message id.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        attributes: BTreeMap<String, String>,
    ) -> Result<String, ExternalError> {
        let data = serde_json::to_vec(payload).map_err(|error| ExternalError::Decode {
            service: SERVICE,
            message: error.to_string(),
        })?;
        let body = PublishRequest {
            messages: vec![OutboundMessage { data: STANDARD.encode(data), attributes }],
        };

        let mut request =
            self.client.post(format!("{}/{}:publish", self.endpoint, self.topic_path)).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(ExternalError::request(SERVICE))?;
        let published: PublishResponse = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(ExternalError::decode(SERVICE))?;

        let message_id =
            published.message_ids.into_iter().next().ok_or_else(|| ExternalError::Decode {
                service: SERVICE,
                message: "publish response carried no message id".to_string(),
            })?;
        debug!(
            event_name = "external.pubsub.published",
            topic = %self.topic_path,
            message_id = %message_id,
            "message published"
        );
        Ok(message_id)
    }
}

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<OutboundMessage>,
}

#[derive(Debug, Serialize)]
struct OutboundMessage {
    data: String,
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::PubSubPublisher;
    use crate::error::ExternalError;

    const TOPIC: &str = "projects/guardian-test/topics/inventory-alerts";

    #[tokio::test]
    async fn publish_encodes_payload_and_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{TOPIC}:publish")))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messageIds": ["42"]})))
            .expect(1)
            .mount(&server)
            .await;

        let publisher =
            PubSubPublisher::new(server.uri(), TOPIC, Some(SecretString::from("token-123")));
        let attributes = BTreeMap::from([("severity".to_string(), "high".to_string())]);
        let id = publisher
            .publish(&json!({"product_name": "Cocoa Powder"}), attributes)
            .await
            .expect("publish");
        assert_eq!(id, "42");

        let requests = server.received_requests().await.expect("recording enabled");
        let body: Value = serde_json::from_slice(&requests[0].body).expect("json body");
        let message = &body["messages"][0];
        assert_eq!(message["attributes"]["severity"], "high");

        let data = STANDARD.decode(message["data"].as_str().expect("data string")).expect("base64");
        let decoded: Value = serde_json::from_slice(&data).expect("payload json");
        assert_eq!(decoded["product_name"], "Cocoa Powder");
    }

    #[tokio::test]
    async fn publish_surfaces_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let publisher = PubSubPublisher::new(server.uri(), TOPIC, None);
        let error = publisher.publish(&json!({}), BTreeMap::new()).await.expect_err("403");

        assert!(matches!(error, ExternalError::Status { status: 403, .. }));
    }
}
