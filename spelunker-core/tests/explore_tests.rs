// Tests for exploration runs against a mock labyrinth server

use spelunker_core::explore::{ExploreOptions, execute_exploration};
use spelunker_engine::{AbortHandle, ExploreError, Node};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::{
    Mock, MockServer, Request, Respond, ResponseTemplate,
    matchers::{method, path},
};

/// Answers like the labyrinth server: the cookie names the last room entered.
struct Labyrinth {
    rooms: HashMap<String, Node>,
    entrance: String,
}

impl Labyrinth {
    fn new(entrance: &str, rooms: Vec<Node>) -> Self {
        Self {
            rooms: rooms.into_iter().map(|n| (n.id.clone(), n)).collect(),
            entrance: entrance.to_string(),
        }
    }
}

impl Respond for Labyrinth {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if request.method.as_str() == "GET" {
            return ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("at={}; HttpOnly", self.entrance))
                .set_body_json(&self.rooms[&self.entrance]);
        }

        let at = request
            .headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("at="))
            .unwrap_or_default();
        let xid = serde_json::from_slice::<serde_json::Value>(&request.body)
            .ok()
            .and_then(|v| v["xid"].as_str().map(String::from))
            .unwrap_or_default();

        let adjacent = self
            .rooms
            .get(at)
            .is_some_and(|room| room.neighbors.contains(&xid));
        match self.rooms.get(&xid) {
            Some(room) if adjacent => ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("at={}; HttpOnly", xid))
                .set_body_json(room),
            _ => ResponseTemplate::new(400),
        }
    }
}

fn small_labyrinth() -> Labyrinth {
    Labyrinth::new(
        "E",
        vec![
            Node::new("E", "#ffffff", 0.0, 0.0).with_neighbors(["N", "S"]),
            Node::new("N", "#ff0000", 0.0, 1.0).with_neighbors(["E", "NE"]),
            Node::new("S", "#ff0000", 0.0, -1.0).with_neighbors(["E"]),
            Node::new("NE", "#00ff00", 1.0, 1.0).with_neighbors(["N"]),
        ],
    )
}

async fn serve(name: &str, labyrinth: Labyrinth, server: &MockServer) {
    Mock::given(path(format!("/brizzo/{}", name)))
        .respond_with(labyrinth)
        .mount(server)
        .await;
}

fn options(server: &MockServer, names: &[&str]) -> ExploreOptions {
    ExploreOptions {
        base_url: format!("{}/brizzo/", server.uri()),
        names: names.iter().map(|n| n.to_string()).collect(),
        timeout_secs: Some(5),
        show_progress_bars: false,
    }
}

#[tokio::test]
async fn test_execute_exploration_collects_every_room() {
    let mock_server = MockServer::start().await;
    serve("blarf", small_labyrinth(), &mock_server).await;

    let outcomes = execute_exploration(
        options(&mock_server, &["blarf"]),
        AbortHandle::new(),
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.name, "blarf");
    assert_eq!(outcome.nodes.len(), 4);
    assert_eq!(outcome.nodes[0].id, "E");
    assert_eq!(outcome.stats.discovered, 4);
    assert!(outcome.stats.failures.is_empty());
}

#[tokio::test]
async fn test_node_callback_sees_every_room() {
    let mock_server = MockServer::start().await;
    serve("blarf", small_labyrinth(), &mock_server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    execute_exploration(
        options(&mock_server, &["blarf"]),
        AbortHandle::new(),
        None,
        Some(Arc::new(move |node: &Node| {
            seen_clone.lock().unwrap().push(node.id.clone());
        })),
    )
    .await
    .unwrap();

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["E", "N", "NE", "S"]);
}

#[tokio::test]
async fn test_unreachable_labyrinth_is_skipped() {
    let mock_server = MockServer::start().await;
    serve("blarf", small_labyrinth(), &mock_server).await;
    Mock::given(method("GET"))
        .and(path("/brizzo/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let messages = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();

    let outcomes = execute_exploration(
        options(&mock_server, &["missing", "blarf"]),
        AbortHandle::new(),
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].name, "blarf");

    let messages = messages.lock().unwrap();
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Failed to explore missing") && m.contains("404")),
        "messages: {:?}",
        messages
    );
    assert!(messages.iter().any(|m| m.contains("Exploring labyrinth 2/2: blarf")));
}

#[tokio::test]
async fn test_all_labyrinths_unreachable_is_an_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = execute_exploration(
        options(&mock_server, &["missing"]),
        AbortHandle::new(),
        None,
        None,
    )
    .await;

    assert!(matches!(
        result,
        Err(ExploreError::EntranceUnreachable { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_aborted_before_start_explores_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let abort = AbortHandle::new();
    abort.abort();

    let outcomes = execute_exploration(options(&mock_server, &["blarf"]), abort, None, None)
        .await
        .unwrap();

    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn test_invalid_base_url() {
    let result = execute_exploration(
        ExploreOptions {
            base_url: "not a url".to_string(),
            names: vec!["blarf".to_string()],
            timeout_secs: None,
            show_progress_bars: false,
        },
        AbortHandle::new(),
        None,
        None,
    )
    .await;

    assert!(matches!(result, Err(ExploreError::InvalidUrl(_))));
}
