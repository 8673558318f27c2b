//! JSON fetch with bounded retries.
//!
//! One attempt = one transport call + status check + decode. Any failure (network,
//! non-2xx status, undecodable body) counts as a failed attempt and is retried on the
//! policy's backoff schedule. When attempts run out the last error is returned.

use crate::error::FetchError;
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Wraps a [`Transport`] with a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy<FetchError>,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy<FetchError>) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy<FetchError> {
        &self.policy
    }

    /// GET `url` and decode the body as `T`.
    pub async fn fetch<T>(&self, url: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Send,
    {
        let transport = &self.transport;
        self.policy.execute(|| async move { fetch_once(transport.as_ref(), url).await }).await
    }
}

async fn fetch_once<T>(transport: &dyn Transport, url: &str) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let response = transport.get(url).await?;
    if !response.is_success() {
        return Err(FetchError::Http { status: response.status, status_text: response.status_text });
    }
    Ok(serde_json::from_slice(&response.body)?)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport shared by the fetcher, cache and preload tests.

    use super::*;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    type Reply = Result<RawResponse, FetchError>;

    /// Replies from a per-URL queue first, then from a per-URL fallback.
    /// Unknown URLs answer 404.
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        queued: Mutex<HashMap<String, VecDeque<Reply>>>,
        fallback: Mutex<HashMap<String, Reply>>,
        calls: Mutex<Vec<String>>,
        delay: Option<std::time::Duration>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Each call sleeps on the tokio clock before replying.
        pub fn with_delay(delay: std::time::Duration) -> Self {
            Self { delay: Some(delay), ..Self::default() }
        }

        pub fn always(&self, url: &str, reply: Reply) -> &Self {
            self.fallback.lock().unwrap().insert(url.to_string(), reply);
            self
        }

        pub fn then(&self, url: &str, reply: Reply) -> &Self {
            self.queued.lock().unwrap().entry(url.to_string()).or_default().push_back(reply);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls().iter().filter(|u| u.as_str() == url).count()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let queued = self.queued.lock().unwrap().get_mut(url).and_then(VecDeque::pop_front);
            if let Some(reply) = queued {
                return reply;
            }
            self.fallback
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Ok(RawResponse::with_status(404, "Not Found")))
        }
    }

    pub fn envelope(regions: &[(&str, &str)]) -> Reply {
        let data: Vec<_> = regions
            .iter()
            .map(|(code, name)| serde_json::json!({ "code": code, "name": name }))
            .collect();
        Ok(RawResponse::ok(serde_json::json!({ "data": data, "meta": {} }).to_string()))
    }
}
