//! HTTP front end on tiny_http: one thread per request, sharing the detector.
//!
//! Routes:
//! - `GET /` single-page UI
//! - `GET /health`
//! - `GET /languages`
//! - `POST /analyze` with `{"text": ..., "language": ...}`

use std::io::Read;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};
use translate::Language;

use crate::detector::{AnalysisError, AnalysisRequest, Detector};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: u64 = 1 << 20;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Server startup failure.
#[derive(Debug, thiserror::Error)]
#[error("failed to bind {addr}: {source}")]
pub struct ServeError {
    /// requested listen address
    pub addr: String,
    /// error from the listener
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// A response before it is written to the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status
    pub status: u16,
    /// `Content-Type` header value
    pub content_type: &'static str,
    /// body
    pub body: String,
}

impl Reply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.into() }
    }

    fn json(status: u16, value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, content_type: "application/json", body },
            Err(e) => Self::error(500, &format!("failed to encode response: {e}")),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self { status, content_type: "application/json", body }
    }
}

#[derive(Serialize)]
struct LanguageEntry {
    code: &'static str,
    name: &'static str,
}

/// Dispatch one request. The query string is ignored.
pub fn route(detector: &Detector, method: &Method, url: &str, body: &str) -> Reply {
    let path = url.split('?').next().unwrap_or(url);
    match (method, path) {
        (Method::Get, "/") => {
            Reply { status: 200, content_type: "text/html; charset=utf-8", body: INDEX_HTML.into() }
        }
        (Method::Get, "/health") => Reply::text(200, "OK"),
        (Method::Get, "/languages") => {
            let languages: Vec<LanguageEntry> = Language::ALL
                .into_iter()
                .map(|lang| LanguageEntry { code: lang.code(), name: lang.name() })
                .collect();
            Reply::json(200, &languages)
        }
        (Method::Post, "/analyze") => analyze(detector, body),
        (_, "/" | "/health" | "/languages" | "/analyze") => Reply::text(405, "Method Not Allowed"),
        _ => Reply::text(404, "Not Found"),
    }
}

fn analyze(detector: &Detector, body: &str) -> Reply {
    let request: AnalysisRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return Reply::error(400, &format!("invalid request: {e}")),
    };
    match detector.analyze(&request) {
        Ok(report) => Reply::json(200, &report),
        Err(e @ AnalysisError::EmptyInput) => Reply::error(400, &e.to_string()),
        Err(e @ AnalysisError::Model(_)) => {
            error!(error = %e, "analysis failed");
            Reply::error(500, &e.to_string())
        }
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// Read the whole body, refusing anything over [`MAX_BODY_BYTES`] rather
/// than analyzing a prefix of it.
fn read_body(reader: &mut dyn Read) -> Result<String, Reply> {
    let mut bytes = Vec::new();
    if let Err(e) = reader.take(MAX_BODY_BYTES + 1).read_to_end(&mut bytes) {
        warn!(error = %e, "failed to read request body");
        return Err(Reply::error(400, "could not read request body"));
    }
    if bytes.len() as u64 > MAX_BODY_BYTES {
        warn!(limit = MAX_BODY_BYTES, "request body too large");
        return Err(Reply::error(413, &format!("request body exceeds {MAX_BODY_BYTES} bytes")));
    }
    String::from_utf8(bytes).map_err(|_| Reply::error(400, "request body is not valid UTF-8"))
}

fn handle(mut request: Request, detector: &Detector) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let reply = match read_body(request.as_reader()) {
        Ok(body) => route(detector, &method, &url, &body),
        Err(reply) => reply,
    };
    debug!(%method, %url, status = reply.status, "request served");

    let mut response = Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
    for h in [header("Content-Type", reply.content_type), header("Access-Control-Allow-Origin", "*")]
        .into_iter()
        .flatten()
    {
        response.add_header(h);
    }
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to send response");
    }
}

/// Listen on `addr` until the process exits.
pub fn serve(detector: Arc<Detector>, addr: &str) -> Result<(), ServeError> {
    let server = Server::http(addr).map_err(|source| ServeError { addr: addr.to_string(), source })?;
    info!(addr, "server listening");
    for request in server.incoming_requests() {
        let detector = Arc::clone(&detector);
        thread::spawn(move || handle(request, &detector));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use perplexity::{BigramModel, ByteEncoder, LanguageModel, ModelError, PerplexityScorer};

    struct Broken;

    impl LanguageModel for Broken {
        fn vocab_size(&self) -> usize {
            256
        }
        fn max_context(&self) -> usize {
            64
        }
        fn logits(&self, _: &[u32]) -> Result<Vec<Vec<f32>>, ModelError> {
            Err(ModelError::Inference("out of memory".into()))
        }
    }

    fn detector() -> Detector {
        Detector::new(PerplexityScorer::new(ByteEncoder, BigramModel::seeded(256, 11)))
    }

    #[test]
    fn health_and_index() {
        let d = detector();
        assert_eq!(route(&d, &Method::Get, "/health", ""), Reply::text(200, "OK"));
        let index = route(&d, &Method::Get, "/?lang=en", "");
        assert_eq!(index.status, 200);
        assert!(index.content_type.starts_with("text/html"));
        assert!(index.body.contains("/analyze"));
    }

    #[test]
    fn languages_are_listed() {
        let reply = route(&detector(), &Method::Get, "/languages", "");
        let list: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(Language::ALL.len()));
        assert_eq!(list[5]["code"], "zh-cn");
    }

    #[test]
    fn analyze_returns_report_json() {
        let reply = route(
            &detector(),
            &Method::Post,
            "/analyze",
            r#"{"text":"the cat sat. the cat ran.","language":"en"}"#,
        );
        assert_eq!(reply.status, 200, "{}", reply.body);
        let report: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(report["input"], "the cat sat. the cat ran.");
        assert!(report["perplexity"]["value"].as_f64().is_some());
        assert!(report["burstiness"].as_f64().is_some());
        assert_eq!(report["top_words"][0]["word"], "cat");
        assert!(report["disclaimer"].as_str().unwrap_or_default().starts_with("Disclaimer"));
    }

    #[test]
    fn bad_and_empty_input_are_client_errors() {
        let d = detector();
        assert_eq!(route(&d, &Method::Post, "/analyze", "not json").status, 400);
        assert_eq!(route(&d, &Method::Post, "/analyze", r#"{"text":"x","language":"xx"}"#).status, 400);
        let empty = route(&d, &Method::Post, "/analyze", r#"{"text":"   "}"#);
        assert_eq!(empty.status, 400);
        assert!(empty.body.contains("empty"));
    }

    #[test]
    fn model_failure_is_a_server_error() {
        let d = Detector::new(PerplexityScorer::new(ByteEncoder, Broken));
        let reply = route(&d, &Method::Post, "/analyze", r#"{"text":"some words"}"#);
        assert_eq!(reply.status, 500);
        assert!(reply.body.contains("out of memory"));
    }

    #[test]
    fn unknown_routes() {
        let d = detector();
        assert_eq!(route(&d, &Method::Get, "/missing", "").status, 404);
        assert_eq!(route(&d, &Method::Get, "/analyze", "").status, 405);
    }

    #[test]
    fn serves_over_loopback() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let d = Arc::new(detector());
        let worker = thread::spawn(move || {
            let request = server.recv().unwrap();
            handle(request, &d);
        });
        let response = raw_get(&addr.to_string(), "/health");
        worker.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("Access-Control-Allow-Origin: *"), "{response}");
        assert!(response.ends_with("OK"), "{response}");
    }

    #[test]
    fn body_over_the_limit_is_refused() {
        let limit = MAX_BODY_BYTES as usize;
        let mut at_limit = std::io::Cursor::new(vec![b'a'; limit]);
        assert_eq!(read_body(&mut at_limit).map(|b| b.len()), Ok(limit));

        let mut over = std::io::Cursor::new(vec![b'a'; limit + 1]);
        let reply = read_body(&mut over).unwrap_err();
        assert_eq!(reply.status, 413);
        assert!(reply.body.contains("exceeds"));
    }

    #[test]
    fn body_must_be_utf8() {
        let mut invalid = std::io::Cursor::new(vec![b'{', 0xff, b'}']);
        assert_eq!(read_body(&mut invalid).unwrap_err().status, 400);
    }

    #[test]
    fn oversized_post_gets_413_over_loopback() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let d = Arc::new(detector());
        let worker = thread::spawn(move || {
            let request = server.recv().unwrap();
            handle(request, &d);
        });
        let wrapper = r#"{"text":""}"#.len();
        let text = "a".repeat(MAX_BODY_BYTES as usize + 1 - wrapper);
        let body = format!(r#"{{"text":"{text}"}}"#);
        assert_eq!(body.len() as u64, MAX_BODY_BYTES + 1);
        let response = raw_request(&addr.to_string(), "POST", "/analyze", &body);
        worker.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 413"), "{}", &response[..response.len().min(200)]);
    }

    fn raw_get(host: &str, path: &str) -> String {
        raw_request(host, "GET", path, "")
    }

    fn raw_request(host: &str, method: &str, path: &str, body: &str) -> String {
        use std::io::Write;
        use std::net::TcpStream;
        let mut stream = TcpStream::connect(host).unwrap();
        write!(
            stream,
            "{method} {path} HTTP/1.1\r\nHost: {host}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }
}
