//! `HttpBackend` against a local HTTP server that records what it receives.

use std::sync::Arc;
use std::sync::Mutex;

use api::product::CatalogQuery;
use api::BackendError;
use api::CartLine;
use api::Credentials;
use api::HttpBackend;
use api::Money;
use api::StorefrontBackend;
use serde_json::json;
use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
struct Received {
    method: String,
    target: String,
    authorization: Option<String>,
    body: String,
}

impl Received {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Log = Arc<Mutex<Vec<Received>>>;

/// Serves `replies` in order, one per connection, and records each request.
async fn serve(replies: Vec<(u16, &'static str)>) -> (HttpBackend, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let recorded = log.clone();
    tokio::spawn(async move {
        for reply in replies {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            answer(stream, reply, &recorded).await;
        }
    });
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    (HttpBackend::with_client(client, format!("http://{addr}/api/v1")), log)
}

async fn answer(stream: TcpStream, (status, payload): (u16, &str), log: &Log) {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await.unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut authorization = None;
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-length" => content_length = value.trim().parse().unwrap(),
                _ => {}
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).await.unwrap();
    log.lock().unwrap().push(Received {
        method,
        target,
        authorization,
        body: String::from_utf8(body).unwrap(),
    });

    let response = format!(
        "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await.unwrap();
    let _ = stream.shutdown().await;
}

#[tokio::test]
async fn cart_endpoints_carry_bearer_token() {
    let (backend, log) = serve(vec![
        (
            200,
            r#"{"cart":[{"id":9,"product_id":3,"title":"Shoe","price":19.5,"image":"s.png","quantity":2}]}"#,
        ),
        (201, r#"{"message":"added"}"#),
        (200, "{}"),
        (200, "{}"),
        (200, r#"{"order_id":42,"total_price":19.5}"#),
    ])
    .await;

    let lines = backend.get_cart("tok").await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, 3);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].price, Money::new_from_minor(1950));

    let line = CartLine::new(3, "Shoe", Money::new_from_minor(1950), "s.png");
    backend.add_cart_item("tok", &line).await.unwrap();
    backend.remove_cart_item("tok", 3).await.unwrap();
    backend.clear_cart("tok").await.unwrap();
    let receipt = backend.checkout("tok").await.unwrap();
    assert_eq!(receipt.order_id, Some(42));
    assert_eq!(receipt.total_price, Some(Money::new_from_minor(1950)));

    let received = log.lock().unwrap().clone();
    let calls: Vec<(&str, &str)> = received
        .iter()
        .map(|r| (r.method.as_str(), r.target.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("GET", "/api/v1/cart"),
            ("POST", "/api/v1/cart"),
            ("DELETE", "/api/v1/cart/3"),
            ("DELETE", "/api/v1/cart"),
            ("POST", "/api/v1/checkout"),
        ]
    );
    for r in &received {
        assert_eq!(r.authorization.as_deref(), Some("Bearer tok"), "{r:?}");
    }

    let added = received[1].json();
    assert_eq!(added["id"], json!(3));
    assert_eq!(added["quantity"], json!(1));
    assert_eq!(added["title"], json!("Shoe"));
    assert_eq!(added["image"], json!("s.png"));
    assert_eq!(received[4].json(), json!({}));
}

#[tokio::test]
async fn catalog_search_is_query_encoded_and_anonymous() {
    let (backend, log) = serve(vec![
        (200, r#"[{"id":"5","title":"Red shoes","price":30}]"#),
        (200, r#"{"products":[{"id":1,"title":"A","price":1},{"id":2,"title":"B","price":2}]}"#),
    ])
    .await;

    let found = backend
        .fetch_catalog(&CatalogQuery::search("red shoes"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 5);

    let batch = backend.fetch_catalog(&CatalogQuery::batch(100)).await.unwrap();
    assert_eq!(batch.len(), 2);

    let received = log.lock().unwrap().clone();
    assert_eq!(received[0].method, "GET");
    assert_eq!(received[0].target, "/api/v1/products?q=red+shoes");
    assert_eq!(received[0].authorization, None);
    assert_eq!(received[1].target, "/api/v1/products?limit=100&skip=0");
}

#[tokio::test]
async fn login_posts_credentials_and_surfaces_server_message() {
    let (backend, log) = serve(vec![
        (200, r#"{"token":"abc","firstName":"Jo"}"#),
        (401, r#"{"message":"Invalid credentials"}"#),
    ])
    .await;

    let credentials = Credentials::new("jo@example.com", "secret1");
    let response = backend.authenticate(&credentials).await.unwrap();
    assert_eq!(response.token(), Some("abc"));

    let err = backend.authenticate(&credentials).await.unwrap_err();
    assert!(
        matches!(&err, BackendError::Status { status: 401, message } if message == "Invalid credentials"),
        "{err:?}"
    );

    let received = log.lock().unwrap().clone();
    assert_eq!(received[0].method, "POST");
    assert_eq!(received[0].target, "/api/v1/login");
    assert_eq!(
        received[0].json(),
        json!({"email": "jo@example.com", "password": "secret1"})
    );
}
