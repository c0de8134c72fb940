use crate::error::{ExploreError, Failure, Result};
use crate::node::Node;
use crate::token::SessionToken;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A node together with the token the server issued alongside it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub node: Node,
    pub token: SessionToken,
}

/// The two requests the labyrinth protocol consists of.
///
/// Implementations perform no retries; a failed call is reported once.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch_entrance(&self, name: &str) -> std::result::Result<Fetched, Failure>;

    async fn fetch_node(
        &self,
        name: &str,
        xid: &str,
        token: &SessionToken,
    ) -> std::result::Result<Fetched, Failure>;
}

pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub token_header: String,
    pub cookie_header: String,
    pub user_agent: String,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            token_header: "set-cookie".to_string(),
            cookie_header: "cookie".to_string(),
            user_agent: format!("spelunker/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(timeout_secs));
        self
    }

    pub fn with_token_headers(
        mut self,
        token_header: impl Into<String>,
        cookie_header: impl Into<String>,
    ) -> Self {
        self.token_header = token_header.into();
        self.cookie_header = cookie_header.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Body of a request asking the server to build a new labyrinth.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRequest {
    pub name: String,
    pub text: String,
    pub shape: String,
    pub seed: u64,
}

impl GraphRequest {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            shape: "hex".to_string(),
            seed: 123,
        }
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = shape.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Serialize)]
struct PutBody<'a> {
    xid: &'a str,
}

pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token_header: String,
    cookie_header: String,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ExploreError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ExploreError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }
        // Graph names are appended as a path segment, so the base must end in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder()
            .user_agent(config.user_agent)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout / 2);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            token_header: config.token_header,
            cookie_header: config.cookie_header,
        })
    }

    /// URL of the resource for one graph.
    pub fn graph_url(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }

    /// Asks the server to build a labyrinth from a message.
    pub async fn create_graph(&self, request: &GraphRequest) -> Result<()> {
        if request.name.trim().is_empty() || request.text.trim().is_empty() {
            return Err(ExploreError::InvalidRequest(
                "both a name and a message are required".to_string(),
            ));
        }

        debug!("Creating graph {} ({} shape, seed {})", request.name, request.shape, request.seed);
        let response = self
            .client
            .post(self.base_url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| ExploreError::CreateFailed(Failure::network(e.to_string())))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(ExploreError::CreateFailed(Failure::status(status.as_u16(), text)))
    }

    async fn read_fetched(&self, response: Response) -> std::result::Result<Fetched, Failure> {
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            return Err(Failure::status(status.as_u16(), reason));
        }

        let token = response
            .headers()
            .get(self.token_header.as_str())
            .and_then(|v| v.to_str().ok())
            .and_then(SessionToken::from_header)
            .ok_or_else(|| {
                Failure::malformed(
                    status.as_u16(),
                    format!("response carries no {} header", self.token_header),
                )
            })?;

        let body = response
            .bytes()
            .await
            .map_err(|e| Failure::network(e.to_string()))?;
        let node: Node = serde_json::from_slice(&body)
            .map_err(|e| Failure::malformed(status.as_u16(), e.to_string()))?;

        Ok(Fetched { node, token })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_entrance(&self, name: &str) -> std::result::Result<Fetched, Failure> {
        let url = self.graph_url(name);
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Failure::network(e.to_string()))?;

        self.read_fetched(response).await
    }

    async fn fetch_node(
        &self,
        name: &str,
        xid: &str,
        token: &SessionToken,
    ) -> std::result::Result<Fetched, Failure> {
        let url = self.graph_url(name);
        debug!("PUT {} xid={}", url, xid);

        let response = self
            .client
            .put(url)
            .header(self.cookie_header.as_str(), token.as_str())
            .json(&PutBody { xid })
            .send()
            .await
            .map_err(|e| Failure::network(e.to_string()))?;

        self.read_fetched(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn room_json(xid: &str, see: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "xid": xid,
            "col": "#336699",
            "pos": { "x": 1, "y": 2 },
            "see": see,
        })
    }

    async fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(TransportConfig::new(format!("{}/brizzo", server.uri()))).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_entrance_reads_node_and_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brizzo/blarf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "trail=entrance; Path=/")
                    .set_body_json(room_json("ENTRANCE", &["A", "B"])),
            )
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        let fetched = transport.fetch_entrance("blarf").await.unwrap();

        assert_eq!(fetched.node.id, "ENTRANCE");
        assert_eq!(fetched.node.neighbors, vec!["A", "B"]);
        assert_eq!(fetched.token.as_str(), "trail=entrance");
    }

    #[tokio::test]
    async fn test_fetch_node_presents_token_and_xid() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/brizzo/blarf"))
            .and(header("cookie", "trail=entrance"))
            .and(body_json(serde_json::json!({ "xid": "A" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "trail=a")
                    .set_body_json(room_json("A", &[])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        let fetched = transport
            .fetch_node("blarf", "A", &SessionToken::new("trail=entrance"))
            .await
            .unwrap();

        assert_eq!(fetched.node.id, "A");
        assert_eq!(fetched.token.as_str(), "trail=a");
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/brizzo/blarf"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        let failure = transport
            .fetch_node("blarf", "A", &SessionToken::new("trail=x"))
            .await
            .unwrap_err();

        assert_eq!(failure.status, 500);
        assert_eq!(failure.kind, FailureKind::Status);
    }

    #[tokio::test]
    async fn test_missing_token_header_is_malformed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brizzo/blarf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(room_json("E", &[])))
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        let failure = transport.fetch_entrance("blarf").await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Malformed);
    }

    #[tokio::test]
    async fn test_bad_body_is_malformed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brizzo/blarf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "trail=e")
                    .set_body_json(serde_json::json!({ "xid": "E" })),
            )
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        let failure = transport.fetch_entrance("blarf").await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Malformed);
        assert_eq!(failure.status, 200);
    }

    #[tokio::test]
    async fn test_unreachable_server_uses_network_status() {
        let transport =
            HttpTransport::new(TransportConfig::new("http://127.0.0.1:1/").with_timeout(2)).unwrap();
        let failure = transport.fetch_entrance("blarf").await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Network);
        assert_eq!(failure.status, crate::error::NETWORK_FAILURE_STATUS);
    }

    #[test]
    fn test_graph_url_encodes_name() {
        let transport = HttpTransport::new(TransportConfig::new("http://localhost:3003/brizzo")).unwrap();
        assert_eq!(
            transport.graph_url("hello world").as_str(),
            "http://localhost:3003/brizzo/hello%20world"
        );
        assert_eq!(
            transport.graph_url("blarf").as_str(),
            "http://localhost:3003/brizzo/blarf"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpTransport::new(TransportConfig::new("not a url"));
        assert!(matches!(result, Err(ExploreError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_create_graph_posts_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/brizzo/"))
            .and(body_json(serde_json::json!({
                "name": "blarf",
                "text": "hello",
                "shape": "hex",
                "seed": 123,
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        transport
            .create_graph(&GraphRequest::new("blarf", "hello"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_graph_reports_server_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/brizzo/"))
            .respond_with(ResponseTemplate::new(409).set_body_string("name already taken"))
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server).await;
        let err = transport
            .create_graph(&GraphRequest::new("blarf", "hello").with_seed(7))
            .await
            .unwrap_err();

        match err {
            ExploreError::CreateFailed(failure) => {
                assert_eq!(failure.status, 409);
                assert_eq!(failure.message, "name already taken");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_create_graph_rejects_empty_message() {
        let transport = HttpTransport::new(TransportConfig::new("http://localhost/")).unwrap();
        let result = transport.create_graph(&GraphRequest::new("blarf", "  ")).await;
        assert!(matches!(result, Err(ExploreError::InvalidRequest(_))));
    }
}
