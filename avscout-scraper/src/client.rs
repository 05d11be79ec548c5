use std::collections::HashMap;

use avscout_lib::NetworkSettings;
use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::error::{ConnectorError, ScrapeError};

/// Pause before retry `n` is `n` times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// One GET issued on behalf of a connector.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    /// Site id, used in errors and logs
    pub site: &'a str,
    /// Id being looked up, used for not-found errors
    pub id: &'a str,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(site: &'a str, id: &'a str, url: impl Into<String>) -> Self {
        Self {
            site,
            id,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP clients shared by every connector in a run, one per host.
///
/// Each client keeps its own connection pool and cookie jar, so session cookies
/// set by a site survive across movies.
pub struct HttpPool {
    timeout: Duration,
    retry: u32,
    user_agent: String,
    proxy: Option<reqwest::Proxy>,
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl HttpPool {
    pub fn new(network: &NetworkSettings) -> Result<Self, ScrapeError> {
        let proxy = network
            .proxy
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(reqwest::Proxy::all)
            .transpose()?;

        Ok(Self {
            timeout: Duration::from_secs(network.timeout_secs),
            retry: network.retry,
            user_agent: network.user_agent.clone(),
            proxy,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// The client for `url`'s host, built on first use.
    pub async fn client_for(&self, url: &str) -> Result<reqwest::Client, reqwest::Error> {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&host) {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .cookie_store(true);
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(proxy.clone());
        }
        let client = builder.build()?;
        log::debug!("Created HTTP client for '{}'", host);
        clients.insert(host, client.clone());
        Ok(client)
    }

    /// Number of hosts with a live client.
    pub async fn host_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// GET with transport retries and status classification.
    ///
    /// Timeouts and connection failures are retried up to the configured count.
    /// A response is returned only for a success status: 404 is not-found,
    /// 401 a credential failure, 403/451 a block, anything else a site error.
    pub async fn get(&self, req: &FetchRequest<'_>) -> Result<reqwest::Response, ConnectorError> {
        let client = self
            .client_for(&req.url)
            .await
            .map_err(|e| ConnectorError::site(req.site, format!("client setup failed: {}", e)))?;

        let attempts = self.retry + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = client.get(&req.url);
            for (name, value) in &req.headers {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(response) => return check_status(response, req),
                Err(e) if is_transient(&e) && attempt < attempts => {
                    log::debug!(
                        "{}: attempt {}/{} for {} failed: {}",
                        req.site,
                        attempt,
                        attempts,
                        req.url,
                        e
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) if is_transient(&e) => {
                    return Err(ConnectorError::Transport {
                        site: req.site.to_string(),
                        attempts,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(ConnectorError::site(req.site, e.to_string())),
            }
        }
    }

    /// GET and decode a JSON body.
    pub async fn get_json(
        &self,
        req: &FetchRequest<'_>,
    ) -> Result<serde_json::Value, ConnectorError> {
        let response = self.get(req).await?;
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Transport {
                    site: req.site.to_string(),
                    attempts: 1,
                    message: e.to_string(),
                }
            } else {
                ConnectorError::site(req.site, format!("invalid JSON from {}: {}", req.url, e))
            }
        })
    }

    /// Whether `url` answers a GET with a success status within `timeout`.
    pub async fn probe(&self, url: &str, timeout: Duration) -> bool {
        let client = match self.client_for(url).await {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Probe of {} skipped: {}", url, e);
                return false;
            }
        };
        match client.get(url).timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("Probe of {} failed: {}", url, e);
                false
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

fn check_status(
    response: reqwest::Response,
    req: &FetchRequest<'_>,
) -> Result<reqwest::Response, ConnectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(match status.as_u16() {
        404 => ConnectorError::not_found(req.site, req.id),
        401 => ConnectorError::credential(req.site, "HTTP 401"),
        403 | 451 => ConnectorError::blocked(req.site),
        _ => ConnectorError::site(req.site, format!("unexpected HTTP status {}", status)),
    })
}
