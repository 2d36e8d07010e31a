use std::env;
use std::thread;
use std::time::Duration;

use promptmaster_contracts::session::ActiveAuth;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;
use tracing::{debug, warn};

use crate::response::remote_error_message;
use crate::AdapterError;

pub const GENERIC_FAILURE_MESSAGE: &str =
    "API call failed; check your key and endpoint configuration.";

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_BACKOFF: Duration = Duration::from_millis(1200);
const MAX_BACKOFF_SECS: f64 = 60.0;

/// One `generateContent` round trip. The adapter never talks HTTP directly.
pub trait GenerateTransport {
    fn generate(&self, model: &str, payload: &Value) -> Result<Value, AdapterError>;
}

impl<T: GenerateTransport + ?Sized> GenerateTransport for &T {
    fn generate(&self, model: &str, payload: &Value) -> Result<Value, AdapterError> {
        (**self).generate(model, payload)
    }
}

/// Transport-level retries. Off unless configured; HTTP error statuses are
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Backoff is capped at a minute; a non-finite value falls back to the default.
    pub fn new(max_retries: usize, backoff_secs: f64) -> Self {
        let backoff = if backoff_secs.is_finite() {
            Duration::try_from_secs_f64(backoff_secs.clamp(0.0, MAX_BACKOFF_SECS)).ok()
        } else {
            None
        };
        Self {
            max_retries,
            backoff: backoff.unwrap_or(DEFAULT_BACKOFF),
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        self.backoff * (attempt as u32 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    Inline(String),
    /// Host-managed: read from the environment on every call.
    Env(String),
}

impl ApiKeySource {
    fn resolve(&self) -> Result<String, AdapterError> {
        match self {
            ApiKeySource::Inline(token) => Ok(token.clone()),
            ApiKeySource::Env(var) => env::var(var)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AdapterError::MissingCredential(format!("{var} is not set"))),
        }
    }
}

pub struct HttpTransport {
    http: HttpClient,
    endpoint: String,
    key: ApiKeySource,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Without a timeout the call blocks until the service settles.
    pub fn new(
        auth: &ActiveAuth,
        host_key_env: &str,
        retry: RetryPolicy,
        timeout: Option<Duration>,
    ) -> Result<Self, AdapterError> {
        let key = match auth {
            ActiveAuth::Supplied(credential) => ApiKeySource::Inline(credential.token().to_string()),
            ActiveAuth::HostManaged { .. } => ApiKeySource::Env(host_key_env.to_string()),
        };
        let endpoint = auth.endpoint().to_string();
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| AdapterError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint,
            key,
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn url_for(&self, model: &str) -> String {
        generate_url(&self.endpoint, model)
    }

    fn post_with_transport_retries(
        &self,
        url: &str,
        api_key: &str,
        payload: &Value,
    ) -> Result<HttpResponse, AdapterError> {
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(url)
                .header(API_KEY_HEADER, api_key)
                .json(payload)
                .send();
            match response {
                Ok(ok) => return Ok(ok),
                Err(source) => {
                    if !is_retryable_transport_error(&source) || attempt >= self.retry.max_retries
                    {
                        return Err(AdapterError::Transport {
                            endpoint: url.to_string(),
                            source,
                        });
                    }
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        error = %source,
                        "transport retry after transient request failure"
                    );
                    thread::sleep(self.retry.delay_for(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

impl GenerateTransport for HttpTransport {
    fn generate(&self, model: &str, payload: &Value) -> Result<Value, AdapterError> {
        let api_key = self.key.resolve()?;
        let url = self.url_for(model);
        debug!(%url, "posting generateContent");
        let response = self.post_with_transport_retries(&url, &api_key, payload)?;
        response_json_or_error(response)
    }
}

pub(crate) fn generate_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model.trim()
    )
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, AdapterError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .map_err(|err| AdapterError::Decode(format!("response body read failed: {err}")))?;
    if !status.is_success() {
        return Err(remote_failure(Some(code), &body));
    }
    serde_json::from_str(&body)
        .map_err(|err| AdapterError::Decode(format!("invalid JSON payload: {err}")))
}

pub(crate) fn remote_failure(status: Option<u16>, body: &str) -> AdapterError {
    AdapterError::Remote {
        status,
        message: remote_error_message(body).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
    }
}

fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use promptmaster_contracts::session::{ActiveAuth, Credential};
    use serde_json::json;

    use super::{
        generate_url, remote_failure, ApiKeySource, HttpTransport, RetryPolicy,
        GENERIC_FAILURE_MESSAGE,
    };
    use super::GenerateTransport;
    use crate::AdapterError;

    /// Requests seen by a loopback server: the count and the API key header of each.
    #[derive(Default)]
    struct Seen {
        hits: AtomicUsize,
        keys: Mutex<Vec<Option<String>>>,
    }

    /// Serves `status` with `body` to every request on an ephemeral local port.
    fn serve(status: &'static str, body: &'static str) -> anyhow::Result<(String, Arc<Seen>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let endpoint = format!("http://{}", listener.local_addr()?);
        let seen = Arc::new(Seen::default());
        let recorder = Arc::clone(&seen);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(&mut stream);
                let mut key = None;
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        let name = name.trim().to_ascii_lowercase();
                        if name == "x-goog-api-key" {
                            key = Some(value.trim().to_string());
                        } else if name == "content-length" {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                    }
                }
                let mut request_body = vec![0; content_length];
                let _ = reader.read_exact(&mut request_body);
                recorder.hits.fetch_add(1, Ordering::SeqCst);
                if let Ok(mut keys) = recorder.keys.lock() {
                    keys.push(key);
                }
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        Ok((endpoint, seen))
    }

    fn transport_for(endpoint: &str, retry: RetryPolicy) -> anyhow::Result<HttpTransport> {
        let auth = ActiveAuth::Supplied(Credential::new("AIzaSyLoopback0001", Some(endpoint)));
        Ok(HttpTransport::new(&auth, "GEMINI_API_KEY", retry, Some(Duration::from_secs(5)))?)
    }

    #[test]
    fn error_status_is_reported_once_without_retrying() -> anyhow::Result<()> {
        let (endpoint, seen) = serve("500 Internal Server Error", r#"{"error":{"message":"boom"}}"#)?;
        let transport = transport_for(&endpoint, RetryPolicy::new(2, 0.01))?;

        let err = transport.generate("gemini-3-flash-preview", &json!({})).err();
        assert!(matches!(
            err,
            Some(AdapterError::Remote { status: Some(500), ref message }) if message == "boom"
        ));
        assert_eq!(seen.hits.load(Ordering::SeqCst), 1);
        let keys = seen.keys.lock().map(|keys| keys.clone()).unwrap_or_default();
        assert_eq!(keys, vec![Some("AIzaSyLoopback0001".to_string())]);
        Ok(())
    }

    #[test]
    fn non_json_error_body_falls_back_to_generic_message() -> anyhow::Result<()> {
        let (endpoint, seen) = serve("502 Bad Gateway", "<html>upstream down</html>")?;
        let transport = transport_for(&endpoint, RetryPolicy::default())?;

        let err = transport.generate("gemini-3-flash-preview", &json!({})).err();
        assert!(matches!(
            err,
            Some(AdapterError::Remote { status: Some(502), ref message }) if message == GENERIC_FAILURE_MESSAGE
        ));
        assert_eq!(seen.hits.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn success_body_is_returned_as_json() -> anyhow::Result<()> {
        let (endpoint, _seen) = serve("200 OK", r#"{"candidates":[]}"#)?;
        let transport = transport_for(&endpoint, RetryPolicy::default())?;
        let value = transport.generate("gemini-3-flash-preview", &json!({}))?;
        assert_eq!(value, json!({"candidates": []}));
        Ok(())
    }

    #[test]
    fn refused_connection_is_retried_with_backoff() -> anyhow::Result<()> {
        let endpoint = {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            format!("http://{}", listener.local_addr()?)
        };
        let transport = transport_for(&endpoint, RetryPolicy::new(2, 0.01))?;

        let started = Instant::now();
        let err = transport.generate("gemini-3-flash-preview", &json!({})).err();
        assert!(matches!(err, Some(AdapterError::Transport { .. })));
        // Two retries sleep 10ms then 20ms before giving up.
        assert!(started.elapsed() >= Duration::from_millis(30));
        Ok(())
    }

    #[test]
    fn url_targets_generate_content_under_v1beta() {
        assert_eq!(
            generate_url("https://relay.example/", "gemini-3-flash-preview"),
            "https://relay.example/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn remote_failure_prefers_service_message() {
        let err = remote_failure(Some(429), r#"{"error": {"message": "Resource exhausted"}}"#);
        assert!(matches!(
            err,
            AdapterError::Remote { status: Some(429), ref message } if message == "Resource exhausted"
        ));
        let fallback = remote_failure(Some(502), "upstream timeout");
        assert!(matches!(
            fallback,
            AdapterError::Remote { ref message, .. } if message == GENERIC_FAILURE_MESSAGE
        ));
    }

    #[test]
    fn retry_is_off_by_default_and_backs_off_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        let configured = RetryPolicy::new(2, 0.5);
        assert_eq!(configured.delay_for(0), Duration::from_millis(500));
        assert_eq!(configured.delay_for(1), Duration::from_millis(1000));
    }

    #[test]
    fn retry_backoff_rejects_non_finite_and_caps_large_values() {
        assert_eq!(RetryPolicy::new(1, f64::NAN).backoff, Duration::from_millis(1200));
        assert_eq!(RetryPolicy::new(1, f64::INFINITY).backoff, Duration::from_millis(1200));
        assert_eq!(RetryPolicy::new(1, 1e300).backoff, Duration::from_secs(60));
        assert_eq!(RetryPolicy::new(1, -3.0).backoff, Duration::ZERO);
    }

    #[test]
    fn transport_uses_credential_endpoint_and_key() -> anyhow::Result<()> {
        let auth = ActiveAuth::Supplied(Credential::new("AIzaSyExample123", Some("https://relay.example/")));
        let transport = HttpTransport::new(&auth, "GEMINI_API_KEY", RetryPolicy::default(), None)?;
        assert_eq!(transport.endpoint(), "https://relay.example");
        assert_eq!(transport.key, ApiKeySource::Inline("AIzaSyExample123".to_string()));
        Ok(())
    }

    #[test]
    fn host_managed_key_is_read_from_environment() -> anyhow::Result<()> {
        let auth = ActiveAuth::HostManaged {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
        };
        let transport = HttpTransport::new(
            &auth,
            "PROMPTMASTER_TEST_UNSET_HOST_KEY",
            RetryPolicy::default(),
            Some(Duration::from_secs(5)),
        )?;
        assert!(matches!(
            transport.key.resolve(),
            Err(AdapterError::MissingCredential(_))
        ));
        Ok(())
    }
}
