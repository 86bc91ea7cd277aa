//! One-shot HTTP responder used by the client tests.

use super::ApiClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the client sent.
pub(crate) struct CapturedRequest {
    /// e.g. `POST /api/create-image HTTP/1.1`
    pub request_line: String,
    /// Raw header block.
    pub headers: String,
    /// Raw body bytes (chunk framing included if the client streamed).
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        header_value(&self.headers, name)
    }
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// Accepts one connection, records the request, and answers with `status`
/// (e.g. `"429 Too Many Requests"`) and a JSON `body`.
pub(crate) async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (ApiClient, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let (request_line, headers) = head
            .split_once("\r\n")
            .map(|(line, rest)| (line.to_string(), rest.to_string()))
            .unwrap_or_default();
        let content_length =
            header_value(&headers, "content-length").and_then(|v| v.parse::<usize>().ok());
        let chunked = header_value(&headers, "transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));

        loop {
            let done = match content_length {
                Some(len) => buf.len() - header_end >= len,
                None if chunked => buf.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if done {
                break;
            }
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        CapturedRequest {
            request_line,
            headers,
            body: buf[header_end..].to_vec(),
        }
    });

    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let client = ApiClient::builder()
        .base_url(base_url)
        .http_client(http)
        .build()
        .unwrap();
    (client, handle)
}
