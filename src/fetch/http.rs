//! HTTP transport abstraction for testability.
//!
//! The fetch client never talks to ureq directly; it goes through this trait
//! so tests can script transport outcomes without a network.

use std::io::Read;
use std::time::Duration;

use crate::error::IngestError;

/// Bodies larger than this are cut off and treated as failures; no provider
/// serves legitimate assets anywhere near it.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait HttpFetch: Send + Sync {
    /// Perform a GET. `query` pairs are appended percent-encoded. Any HTTP
    /// status is returned as a response; only transport-level failures
    /// (connect, timeout, truncated body) are errors, always transient.
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, IngestError>;
}

/// Production transport backed by a ureq agent with a per-attempt timeout.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl HttpFetch for UreqClient {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, IngestError> {
        let mut request = self.agent.get(url);
        for (name, value) in query {
            request = request.query(name, value);
        }
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let response = match request.call() {
            Ok(response) => response,
            // Non-2xx still carries a response; classification happens in the
            // fetch client, not here.
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(IngestError::Transient(format!(
                    "transport error for {}: {}",
                    url, transport
                )));
            }
        };

        let status = response.status();
        let content_type = response.content_type().to_string();

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| IngestError::Transient(format!("truncated response from {}: {}", url, e)))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::sync::Mutex;

    /// Scripted transport: each call pops the next outcome. Records requested
    /// URLs so tests can assert on call order.
    pub struct ScriptedHttp {
        outcomes: Mutex<Vec<Result<HttpResponse, IngestError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedHttp {
        pub fn new(outcomes: Vec<Result<HttpResponse, IngestError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn ok(status: u16, content_type: &str, body: Vec<u8>) -> Result<HttpResponse, IngestError> {
            Ok(HttpResponse {
                status,
                content_type: content_type.to_string(),
                body,
            })
        }
    }

    impl HttpFetch for ScriptedHttp {
        fn get(
            &self,
            url: &str,
            _query: &[(&str, &str)],
            _headers: &[(&str, &str)],
        ) -> Result<HttpResponse, IngestError> {
            self.requests.lock().unwrap().push(url.to_string());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Err(IngestError::Transient("script exhausted".to_string()));
            }
            outcomes.remove(0)
        }
    }

    /// URL-keyed transport: the same request always gets the same answer,
    /// which is what idempotence tests need. Unrouted URLs fail permanently.
    pub struct RoutedHttp {
        routes: Vec<(String, HttpResponse)>,
    }

    impl RoutedHttp {
        pub fn new(routes: Vec<(&str, HttpResponse)>) -> Self {
            Self {
                routes: routes
                    .into_iter()
                    .map(|(url, response)| (url.to_string(), response))
                    .collect(),
            }
        }

        pub fn response(status: u16, content_type: &str, body: Vec<u8>) -> HttpResponse {
            HttpResponse {
                status,
                content_type: content_type.to_string(),
                body,
            }
        }
    }

    impl HttpFetch for RoutedHttp {
        fn get(
            &self,
            url: &str,
            _query: &[(&str, &str)],
            _headers: &[(&str, &str)],
        ) -> Result<HttpResponse, IngestError> {
            for (route, response) in &self.routes {
                if url == route {
                    return Ok(response.clone());
                }
            }
            Err(IngestError::Permanent(format!("no route for {}", url)))
        }
    }
}
