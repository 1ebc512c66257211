//! Local axum server answering with canned responses, for exercising the
//! clients over real HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;

type RequestLog = Arc<Mutex<Vec<ReceivedRequest>>>;

/// A request as received by the server.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// A canned response: status, extra headers, body.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl CannedResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

impl IntoResponse for CannedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap();
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        (status, headers, self.body).into_response()
    }
}

#[derive(Clone)]
struct Route {
    response: CannedResponse,
    log: RequestLog,
}

pub struct TestServer {
    pub base_url: String,
    received: RequestLog,
}

impl TestServer {
    /// Serve `routes` (path -> response) until the test ends. Unknown paths
    /// get a 404.
    pub async fn start(routes: Vec<(&'static str, CannedResponse)>) -> Self {
        let received: RequestLog = Arc::new(Mutex::new(Vec::new()));

        let mut app = Router::new();
        for (path, response) in routes {
            let route = Route {
                response,
                log: Arc::clone(&received),
            };
            app = app.route(path, any(respond).with_state(route));
        }
        let fallback_log = Arc::clone(&received);
        let app = app.fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let log = Arc::clone(&fallback_log);
                async move {
                    record(&log, method, uri, headers, body);
                    (StatusCode::NOT_FOUND, "not found")
                }
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            received,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn respond(
    State(route): State<Route>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> CannedResponse {
    record(&route.log, method, uri, headers, body);
    route.response
}

fn record(log: &RequestLog, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect();

    log.lock().unwrap().push(ReceivedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers,
        body: body.to_vec(),
    });
}
