//! Provider contract tests
//!
//! Verify request format and response/error mapping for each transport
//! against a local mock of the provider API.

use std::time::Duration;

use serde_json::json;
use tripcount_channels::{TwilioMode, TwilioTransport, WhatsAppCloudTransport, http_client};
use tripcount_core::config::{TwilioConfig, WhatsAppCloudConfig};
use tripcount_core::{Notice, Recipient, Transport, TripError};
use wiremock::matchers::{basic_auth, bearer_token, body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn twilio_config() -> TwilioConfig {
    TwilioConfig {
        account_sid: "AC123".into(),
        auth_token: "secret".into(),
        sender_number: "+15005550006".into(),
        whatsapp_number: "+14155238886".into(),
        content_sid: String::new(),
    }
}

fn notice() -> Notice {
    Notice {
        body: "Hola! Faltan 6 dias para nuestro viaje: Viaje.".into(),
        countdown_days: 6,
        description: "Viaje".into(),
        link: String::new(),
    }
}

fn chris() -> Recipient {
    Recipient::new("Chris", None, "+50254775800").unwrap()
}

fn client() -> reqwest::Client {
    http_client(Duration::from_secs(5)).unwrap()
}

fn twilio(server: &MockServer, mode: TwilioMode, config: TwilioConfig) -> TwilioTransport {
    TwilioTransport::new(config, mode, client()).with_base_url(server.uri())
}

// ────────────────────────────────────────────────────────────────────────────
// Twilio
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_twilio_sms_request_and_sid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(basic_auth("AC123", "secret"))
        .and(body_string_contains("To=%2B50254775800"))
        .and(body_string_contains("From=%2B15005550006"))
        .and(body_string_contains("Body=Hola"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sid": "SM0001",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = twilio(&server, TwilioMode::Sms, twilio_config())
        .send(&chris(), &notice())
        .await
        .unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("SM0001"));
}

#[tokio::test]
async fn test_twilio_whatsapp_template_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(body_string_contains("To=whatsapp%3A%2B50254775800"))
        .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
        .and(body_string_contains("ContentSid=HX42"))
        .and(body_string_contains("ContentVariables="))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM0002"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = twilio_config();
    config.content_sid = "HX42".into();
    let receipt = twilio(&server, TwilioMode::WhatsApp, config)
        .send(&chris(), &notice())
        .await
        .unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("SM0002"));
}

#[tokio::test]
async fn test_twilio_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "code": 63038,
            "message": "Account exceeded the daily messages limit",
            "status": 429
        })))
        .mount(&server)
        .await;

    let err = twilio(&server, TwilioMode::WhatsApp, twilio_config())
        .send(&chris(), &notice())
        .await
        .unwrap_err();
    match err {
        TripError::Transport(msg) => {
            assert!(msg.contains("63038"), "{msg}");
            assert!(msg.contains("daily messages limit"), "{msg}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_twilio_unauthorized_maps_to_auth_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 20003,
            "message": "Authenticate"
        })))
        .mount(&server)
        .await;

    let err = twilio(&server, TwilioMode::Sms, twilio_config())
        .send(&chris(), &notice())
        .await
        .unwrap_err();
    assert!(matches!(err, TripError::AuthFailed(_)), "{err:?}");
}

#[tokio::test]
async fn test_twilio_client_timeout_is_a_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"sid": "SM_late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let transport = TwilioTransport::new(
        twilio_config(),
        TwilioMode::Sms,
        http_client(Duration::from_millis(200)).unwrap(),
    )
    .with_base_url(server.uri());
    let err = transport.send(&chris(), &notice()).await.unwrap_err();
    assert!(matches!(err, TripError::Transport(_)), "{err:?}");
}

// ────────────────────────────────────────────────────────────────────────────
// WhatsApp Cloud API
// ────────────────────────────────────────────────────────────────────────────

fn cloud(server: &MockServer) -> WhatsAppCloudTransport {
    WhatsAppCloudTransport::new(
        WhatsAppCloudConfig {
            access_token: "EAAB".into(),
            phone_number_id: "1055".into(),
        },
        client(),
    )
    .with_base_url(server.uri())
}

#[tokio::test]
async fn test_cloud_text_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v21.0/1055/messages"))
        .and(bearer_token("EAAB"))
        .and(body_partial_json(json!({
            "messaging_product": "whatsapp",
            "to": "50254775800",
            "type": "text",
            "text": {"body": "Hola! Faltan 6 dias para nuestro viaje: Viaje."}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": "50254775800", "wa_id": "50254775800"}],
            "messages": [{"id": "wamid.HBgL"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = cloud(&server).send(&chris(), &notice()).await.unwrap();
    assert_eq!(receipt.message_id.as_deref(), Some("wamid.HBgL"));
}

#[tokio::test]
async fn test_cloud_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v21.0/1055/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Recipient phone number not in allowed list", "code": 131030}
        })))
        .mount(&server)
        .await;

    let err = cloud(&server).send(&chris(), &notice()).await.unwrap_err();
    assert!(err.to_string().contains("131030"), "{err}");
}

#[tokio::test]
async fn test_cloud_verify() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v21.0/1055"))
        .and(bearer_token("EAAB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1055"})))
        .expect(1)
        .mount(&server)
        .await;

    cloud(&server).verify().await.unwrap();
}
