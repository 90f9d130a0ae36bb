//! `reqwest`-backed [`HttpClient`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};

/// Production HTTP client.
///
/// Redirects are never followed: a 308 is a protocol answer here, not a
/// redirect.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with an optional per-request timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(map_reqwest_error)?;
        Ok(Self { http })
    }

    /// Wraps an existing client. The caller is responsible for disabling
    /// redirects.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl HttpClient for ReqwestClient {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let mut builder = match request.method {
                Method::Post => self.http.post(&request.url),
                Method::Put => self.http.put(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(*name, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let resp = builder.send().await.map_err(map_reqwest_error)?;
            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = resp.bytes().await.map_err(map_reqwest_error)?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Starts a one-shot mock HTTP server that answers with `raw_head` and
    /// `body`, and hands back the raw request it received.
    async fn mock_server(
        raw_head: &str,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let resp = format!(
            "{raw_head}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let mut received = String::new();
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                received = String::from_utf8_lossy(&buf[..n]).into_owned();
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            received
        });

        (url, handle)
    }

    #[tokio::test]
    async fn returns_308_without_following() {
        let (url, handle) = mock_server(
            "HTTP/1.1 308 Resume Incomplete\r\nRange: bytes=0-7\r\nLocation: http://127.0.0.1:1/elsewhere",
            "",
        )
        .await;

        let client = ReqwestClient::new(None).unwrap();
        let req = HttpRequest::new(Method::Put, format!("{url}/session"))
            .header("Content-Range", "bytes 0-7/18")
            .body(&b"01234567"[..]);
        let resp = client.send(req).await.unwrap();

        assert_eq!(resp.status, 308);
        assert_eq!(resp.header("range"), Some("bytes=0-7"));

        let raw = handle.await.unwrap();
        assert!(raw.starts_with("PUT /session"));
        assert!(raw.to_ascii_lowercase().contains("content-range: bytes 0-7/18"));
    }

    #[tokio::test]
    async fn posts_json_and_reads_body() {
        let (url, handle) = mock_server(
            "HTTP/1.1 201 Created\r\nContent-Type: application/json",
            r#"{"data":"http://127.0.0.1/s/1"}"#,
        )
        .await;

        let client = ReqwestClient::new(Some(Duration::from_secs(5))).unwrap();
        let req = HttpRequest::new(Method::Post, url)
            .header("Content-Type", "application/json")
            .body(r#"{"fileName":"a.bin"}"#);
        let resp = client.send(req).await.unwrap();

        assert_eq!(resp.status, 201);
        assert_eq!(&resp.body[..], br#"{"data":"http://127.0.0.1/s/1"}"#);

        let raw = handle.await.unwrap();
        assert!(raw.starts_with("POST /"));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ReqwestClient::new(None).unwrap();
        let err = client
            .send(HttpRequest::new(Method::Put, format!("http://127.0.0.1:{port}/s")))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
