use std::net::SocketAddr;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use testx_server::health::HealthCheckConfig;
use testx_server::{ServerOptions, TestxConfig, TestxServer};

const SCHEMA: &str = r#"
    type Author {
        name: String!
        books: [Book!]!
    }

    type Book {
        title: String!
        year: Int
        author: Author
    }
"#;

async fn start(options: ServerOptions) -> (TestxServer, SocketAddr) {
    let mut server = TestxServer::with_options(
        TestxConfig {
            schema: SCHEMA.to_string(),
            data: Some(json!({
                "Author": [{ "id": "1", "name": "Le Guin" }],
                "Book": [{ "title": "The Dispossessed", "year": 1974, "authorId": "1" }]
            })),
        },
        options,
    );
    let address = server.start().await.unwrap();
    (server, address)
}

async fn graphql(address: SocketAddr, body: Value) -> Value {
    let response = reqwest::Client::new()
        .post(format!("http://{address}/graphql"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

async fn control(address: SocketAddr, method: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = reqwest::Client::new().post(format!("http://{address}/testx/{method}"));
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.unwrap();
    (response.status(), response.json().await.unwrap())
}

/// Whether anything still accepts connections on `address`, giving a closing server a moment
async fn still_listening(address: SocketAddr) -> bool {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(address).await.is_err() {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

#[tokio::test]
async fn it_serves_graphql() {
    let (mut server, address) = start(ServerOptions::default()).await;

    let created = graphql(
        address,
        json!({
            "query": "mutation Add($input: BookInput!) { createBook(input: $input) { id title author { name } } }",
            "operationName": "Add",
            "variables": { "input": { "title": "Always Coming Home", "authorId": "1" } }
        }),
    )
    .await;
    assert_eq!(
        created,
        json!({
            "data": {
                "createBook": {
                    "id": "2",
                    "title": "Always Coming Home",
                    "author": { "name": "Le Guin" }
                }
            }
        })
    );

    let listed = graphql(
        address,
        json!({ "query": "{ author(id: 1) { books { title year } } booksCount }" }),
    )
    .await;
    assert_eq!(
        listed,
        json!({
            "data": {
                "author": {
                    "books": [
                        { "title": "The Dispossessed", "year": 1974 },
                        { "title": "Always Coming Home", "year": null }
                    ]
                },
                "booksCount": 2
            }
        })
    );

    let invalid = graphql(address, json!({ "query": "{ books { isbn } }" })).await;
    assert!(invalid.get("data").is_none());
    assert_eq!(invalid["errors"].as_array().map(Vec::len), Some(1));

    server.shutdown().await;
}

#[tokio::test]
async fn it_rejects_malformed_graphql_bodies() {
    let (mut server, address) = start(ServerOptions::default()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{address}/graphql"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    server.shutdown().await;
}

#[tokio::test]
async fn it_reports_health() {
    let (mut server, address) = start(ServerOptions::default()).await;

    let response = reqwest::get(format!("http://{address}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({ "status": "UP" })
    );

    server.shutdown().await;

    let options = ServerOptions::builder()
        .health_check(HealthCheckConfig {
            enabled: false,
            ..Default::default()
        })
        .build();
    let (mut server, address) = start(options).await;

    let response = reqwest::get(format!("http://{address}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn it_controls_data_remotely() {
    let (mut server, address) = start(ServerOptions::default()).await;

    let (status, body) = control(
        address,
        "setData",
        Some(json!({ "Author": [{ "id": "a", "name": "Butler" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (_, data) = control(address, "getData", None).await;
    assert_eq!(
        data,
        json!({ "Author": [{ "id": "a", "name": "Butler" }], "Book": [] })
    );

    let (status, body) = control(address, "setData", Some(json!({ "Author": [{}] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Invalid data: Missing value for required field Author.name" })
    );

    let (status, _) = control(address, "resetData", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.get_data().await.unwrap()["Book"][0]["year"], json!(1974));

    let (_, body) = control(address, "getDatabaseSchema", None).await;
    assert_eq!(
        body["schema"].as_str(),
        Some(server.database_schema().await.unwrap().as_str())
    );

    let (_, body) = control(address, "getGraphQlSchema", None).await;
    assert!(body["schema"].as_str().unwrap().contains("type Author {"));

    server.shutdown().await;
}

#[tokio::test]
async fn it_refuses_unknown_and_lifecycle_methods() {
    let (mut server, address) = start(ServerOptions::default()).await;

    let (status, body) = control(address, "foo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Unknown testx API method: foo" }));

    let (status, _) = control(address, "GetData", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for method in ["bootstrap", "start", "close"] {
        let (status, body) = control(address, method, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body,
            json!({ "error": format!("{method} can't be invoked remotely") })
        );
    }

    server.shutdown().await;
}

#[tokio::test]
async fn control_routes_can_be_disabled() {
    let (mut server, address) = start(ServerOptions::builder().control(false).build()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{address}/testx/getData"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn it_serves_graphql_on_a_custom_path() {
    let (mut server, address) =
        start(ServerOptions::builder().graphql_path("/api").build()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{address}/api"))
        .json(&json!({ "query": "{ authorsCount }" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({ "data": { "authorsCount": 1 } })
    );

    server.shutdown().await;
}

#[tokio::test]
async fn close_stops_serving() {
    let (mut server, address) = start(ServerOptions::default()).await;
    assert!(still_listening(address).await);

    server.close();

    assert!(!still_listening(address).await);
    assert!(server.address().is_none());
}

#[tokio::test]
async fn dropping_a_server_releases_the_listener() {
    let (server, address) = start(ServerOptions::default()).await;

    drop(server);

    assert!(!still_listening(address).await);
}
