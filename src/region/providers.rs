//! Remote location search: the Graph API `adgeolocation` endpoint.

use super::config::ResolverConfig;
use super::types::RegionError;
use serde::Deserialize;

/// One ranked match returned by a search service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchCandidate {
    pub name: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub country_code: String,
}

/// A free-text region search, most relevant candidate first.
///
/// An empty result is a normal "not found". Errors abort the resolution of
/// the region being looked up.
pub trait RegionSearch {
    fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, RegionError>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchCandidate>,
}

/// Blocking client for the Graph API location search.
pub struct GraphSearchClient {
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
}

impl GraphSearchClient {
    pub fn new(
        endpoint: impl Into<String>,
        access_token: &str,
        timeout: Option<std::time::Duration>,
    ) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent("admin-regions/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            endpoint: endpoint.into(),
            authorization: format!("Bearer {}", access_token),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.search_endpoint.clone(),
            &config.access_token,
            config.search_timeout,
        )
    }
}

impl RegionSearch for GraphSearchClient {
    fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, RegionError> {
        let result = self
            .agent
            .get(&self.endpoint)
            .set("Authorization", &self.authorization)
            .query("location_types", r#"["region"]"#)
            .query("type", "adgeolocation")
            .query("q", query)
            .call();

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(RegionError::Status { status, body });
            }
            Err(ureq::Error::Transport(transport)) if is_timeout(&transport) => {
                tracing::warn!(query, error = %transport, "Region search timed out, treating as no match");
                return Ok(Vec::new());
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(RegionError::Network(transport.to_string()));
            }
        };

        let payload: SearchResponse = response
            .into_json()
            .map_err(|e| RegionError::InvalidResponse(e.to_string()))?;
        Ok(payload.data)
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    std::error::Error::source(transport)
        .and_then(|e| e.downcast_ref::<std::io::Error>())
        .map(|e| matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Serve one canned HTTP response on a local port; returns the base URL
    /// and a handle yielding the raw request text.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (format!("http://{}/v8.0/search", addr), handle)
    }

    #[test]
    fn test_search_parses_candidates() {
        let body = r#"{"data":[{"key":"2727","name":"Sindh","type":"region","country_code":"PK","country_name":"Pakistan","supports_region":true},{"name":"Sindhudurg","country_code":"IN","country_name":"India"}]}"#;
        let (url, handle) = serve_once("200 OK", body);
        let client = GraphSearchClient::new(url, "tok123", None);

        let candidates = client.search("Sindh Province").unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0],
            SearchCandidate {
                name: "Sindh".into(),
                country_name: "Pakistan".into(),
                country_code: "PK".into(),
            }
        );

        let request = handle.join().unwrap();
        assert!(request.starts_with("GET /v8.0/search?"));
        assert!(request.contains("type=adgeolocation"));
        assert!(request.contains("q=Sindh"));
        assert!(request.to_lowercase().contains("authorization: bearer tok123"));
    }

    #[test]
    fn test_search_empty_data() {
        let (url, handle) = serve_once("200 OK", r#"{"data":[]}"#);
        let client = GraphSearchClient::new(url, "tok", None);
        assert!(client.search("Atlantis").unwrap().is_empty());
        handle.join().unwrap();
    }

    #[test]
    fn test_search_status_is_hard_error() {
        let (url, handle) = serve_once("400 Bad Request", r#"{"error":{"message":"Invalid OAuth access token."}}"#);
        let client = GraphSearchClient::new(url, "bad", None);
        match client.search("Sindh") {
            Err(RegionError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Invalid OAuth"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_search_invalid_json() {
        let (url, handle) = serve_once("200 OK", "not json");
        let client = GraphSearchClient::new(url, "tok", None);
        assert!(matches!(client.search("Sindh"), Err(RegionError::InvalidResponse(_))));
        handle.join().unwrap();
    }

    /// Accept one connection and hold it open without answering.
    fn serve_silently(hold: Duration) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            thread::sleep(hold);
        });
        (format!("http://{}/v8.0/search", addr), handle)
    }

    #[test]
    fn test_search_timeout_is_no_match() {
        let (url, handle) = serve_silently(Duration::from_secs(3));
        let client = GraphSearchClient::new(url, "tok", Some(Duration::from_millis(300)));

        let started = Instant::now();
        let candidates = client.search("Sindh").unwrap();
        assert!(candidates.is_empty());
        assert!(started.elapsed() < Duration::from_secs(3));
        handle.join().unwrap();
    }

    #[test]
    fn test_search_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = GraphSearchClient::new(format!("http://{}/search", addr), "tok", None);
        assert!(matches!(client.search("Sindh"), Err(RegionError::Network(_))));
    }
}
