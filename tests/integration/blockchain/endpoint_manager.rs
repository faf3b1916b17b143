use mockito::Server;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use thorchain_ingest::services::blockchain::{EndpointManager, TransportError};

use crate::integration::mocks::{AlwaysFailsToConnectTransport, MockTransport};

fn get_mock_client_builder() -> ClientWithMiddleware {
	ClientBuilder::new(reqwest::Client::new()).build()
}

#[tokio::test]
async fn test_send_get_with_query() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/thorchain/block")
		.match_query(mockito::Matcher::UrlEncoded("height".into(), "42".into()))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"header": {"height": "42"}}"#)
		.create_async()
		.await;

	let manager = EndpointManager::new(get_mock_client_builder(), &server.url(), vec![]);
	let result = manager
		.send_get(&MockTransport::new(), "/thorchain/block", &[("height", "42".to_string())])
		.await
		.unwrap();

	assert_eq!(result["header"]["height"], "42");
	mock.assert();
}

#[tokio::test]
async fn test_rotation_on_rate_limit() {
	let mut primary_server = Server::new_async().await;
	let mut fallback_server = Server::new_async().await;

	let primary_mock = primary_server
		.mock("GET", "/thorchain/nodes")
		.with_status(429)
		.with_body("Rate limited")
		.expect(1)
		.create_async()
		.await;
	let fallback_mock = fallback_server
		.mock("GET", "/thorchain/nodes")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body("[]")
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		&primary_server.url(),
		vec![fallback_server.url()],
	);
	let result = manager
		.send_get(&MockTransport::new(), "/thorchain/nodes", &[])
		.await
		.unwrap();

	assert_eq!(result, serde_json::json!([]));
	primary_mock.assert();
	fallback_mock.assert();
	assert_eq!(&*manager.active_url.read().await, &fallback_server.url());
	assert_eq!(
		&*manager.fallback_urls.read().await,
		&vec![primary_server.url()]
	);
}

#[tokio::test]
async fn test_rate_limit_without_fallback_returns_http_error() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/status")
		.with_status(429)
		.with_body("Rate limited")
		.expect(1)
		.create_async()
		.await;

	let manager = EndpointManager::new(get_mock_client_builder(), &server.url(), vec![]);
	let result = manager.send_get(&MockTransport::new(), "/status", &[]).await;

	match result.unwrap_err() {
		TransportError::Http {
			status_code, body, ..
		} => {
			assert_eq!(status_code, 429);
			assert_eq!(body, "Rate limited");
		}
		other => panic!("Expected Http error, got {:?}", other),
	}
	mock.assert();
}

#[tokio::test]
async fn test_error_status_is_returned_without_rotation() {
	let mut primary_server = Server::new_async().await;
	let fallback_server = Server::new_async().await;

	let mock = primary_server
		.mock("GET", "/thorchain/block")
		.with_status(500)
		.with_body(r#"{"code": 3, "message": "height 1 is not available, lowest height is 5"}"#)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		&primary_server.url(),
		vec![fallback_server.url()],
	);
	let result = manager
		.send_get(&MockTransport::new(), "/thorchain/block", &[])
		.await;

	let error = result.unwrap_err();
	assert_eq!(error.status().map(|s| s.as_u16()), Some(500));
	assert!(error.body().unwrap_or_default().contains("lowest height is 5"));
	assert_eq!(&*manager.active_url.read().await, &primary_server.url());
	mock.assert();
}

#[tokio::test]
async fn test_unparsable_body_is_a_parse_error() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/status")
		.with_status(200)
		.with_body("not json")
		.create_async()
		.await;

	let manager = EndpointManager::new(get_mock_client_builder(), &server.url(), vec![]);
	let result = manager.send_get(&MockTransport::new(), "/status", &[]).await;

	assert!(matches!(result, Err(TransportError::ResponseParse(_))));
	mock.assert();
}

#[tokio::test]
async fn test_failed_rotation_keeps_active_url() {
	let server = Server::new_async().await;
	let fallback = Server::new_async().await;

	let manager = EndpointManager::new(get_mock_client_builder(), &server.url(), vec![fallback.url()]);
	let result = manager.try_rotate_url(&AlwaysFailsToConnectTransport).await;

	assert!(matches!(result, Err(TransportError::UrlRotation(_))));
	assert_eq!(&*manager.active_url.read().await, &server.url());
}

#[tokio::test]
async fn test_network_error_rotates_to_fallback() {
	let mut fallback_server = Server::new_async().await;
	let fallback_mock = fallback_server
		.mock("GET", "/status")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"ok": true}"#)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		"http://127.0.0.1:1",
		vec![fallback_server.url()],
	);
	let result = manager
		.send_get(&MockTransport::new(), "/status", &[])
		.await
		.unwrap();

	assert_eq!(result["ok"], true);
	fallback_mock.assert();
	assert_eq!(&*manager.active_url.read().await, &fallback_server.url());
}
