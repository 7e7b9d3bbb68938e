use crate::request::{parse_base_url, RestError, RestRequest};
use reqwest::{header, Client, Url};
use std::time::Duration;
use swarm_core::error::CommandExecutionError;
use swarm_core::runner::{supervise, CommandRunner};
use swarm_core::status::{ExecutionStatus, StatusCell};
use swarm_core::RunnerKind;
use tracing::debug;

/// REST runner: sends one HTTP request per command. The trimmed response body
/// is the output; a non-2xx status becomes the return code.
#[derive(Debug)]
pub struct RestRunner {
    client: Client,
    base_url: Option<Url>,
    status: StatusCell,
}

impl RestRunner {
    pub fn new(base_url: Option<&str>) -> Result<Self, RestError> {
        let base_url = base_url.map(parse_base_url).transpose()?;
        Ok(Self {
            client: Client::new(),
            base_url,
            status: StatusCell::new(),
        })
    }

    async fn send(&self, command: &str) -> Result<String, CommandExecutionError> {
        let request = RestRequest::parse(command, self.base_url.as_ref())
            .map_err(|e| CommandExecutionError::unexpected(command, e))?;
        debug!("HTTP {} {}", request.method, request.url);

        let json = request.is_json();
        let mut builder = self.client.request(request.method, request.url);
        if let Some(body) = request.body {
            if json {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CommandExecutionError::unexpected(command, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CommandExecutionError::unexpected(command, e))?;

        if status.is_success() {
            Ok(body.trim().to_string())
        } else {
            Err(CommandExecutionError::failed(
                command,
                i32::from(status.as_u16()),
                body.trim(),
                status.to_string(),
            ))
        }
    }
}

#[async_trait::async_trait]
impl CommandRunner for RestRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Rest
    }

    async fn run(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String, CommandExecutionError> {
        supervise(&self.status, command, timeout, self.send(command)).await
    }

    fn status(&self) -> ExecutionStatus {
        self.status.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::StatusResult;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve a single canned response and hand back the raw request.
    async fn respond_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn success_returns_trimmed_body() {
        let (base, server) = respond_once("200 OK", "  SWMTKN-1-abc\n").await;
        let runner = RestRunner::new(Some(&base)).unwrap();

        let out = runner
            .run("POST /swarm/join {\"role\": \"worker\"}", None)
            .await
            .unwrap();
        assert_eq!(out, "SWMTKN-1-abc");
        assert_eq!(runner.status().result, StatusResult::Success);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /swarm/join HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with("{\"role\": \"worker\"}"));
    }

    #[tokio::test]
    async fn error_status_becomes_return_code() {
        let (base, server) = respond_once("500 Internal Server Error", "manager down").await;
        let runner = RestRunner::new(Some(&base)).unwrap();

        let err = runner.run("GET /nodes", None).await.unwrap_err();
        assert_eq!(err.command, "GET /nodes");
        assert_eq!(err.return_code, 500);
        assert_eq!(err.stdout, "manager down");
        assert_eq!(runner.status().result, StatusResult::Error);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unparsable_command_is_unexpected() {
        let runner = RestRunner::new(None).unwrap();
        let err = runner.run("GET /nodes", None).await.unwrap_err();
        assert_eq!(err.return_code, -1);
        assert!(err.stderr.contains("needs a base URL"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            RestRunner::new(Some("not a url")),
            Err(RestError::InvalidUrl { .. })
        ));
    }
}
