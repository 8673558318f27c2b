#![allow(dead_code)]

use async_trait::async_trait;
use regionkit::{FetchError, RawResponse, Transport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves canned region envelopes by URL path; fails the first `fail_first` calls.
#[derive(Debug, Default)]
pub struct FakeRegionApi {
    routes: HashMap<String, String>,
    fail_first: usize,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeRegionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, regions: &[(&str, &str)]) -> Self {
        let data: Vec<_> = regions
            .iter()
            .map(|(code, name)| serde_json::json!({ "code": code, "name": name }))
            .collect();
        let body = serde_json::json!({ "data": data, "meta": { "total": regions.len() } });
        self.routes.insert(path.to_string(), body.to_string());
        self
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeRegionApi {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.to_string());
        if n < self.fail_first {
            return Err(FetchError::Network(format!("simulated outage #{n}")));
        }
        let path = url.split_once("/api").map(|(_, p)| p).unwrap_or(url);
        match self.routes.get(path) {
            Some(body) => Ok(RawResponse::ok(body.clone())),
            None => Ok(RawResponse::with_status(404, "Not Found")),
        }
    }
}

pub fn sample_api() -> FakeRegionApi {
    FakeRegionApi::new()
        .route("/provinces.json", &[("11", "ACEH"), ("12", "SUMATERA UTARA")])
        .route("/regencies/11.json", &[("1101", "KAB. SIMEULUE")])
        .route("/districts/1101.json", &[("110101", "TEUPAH SELATAN"), ("110102", "SIMEULUE TIMUR")])
        .route("/villages/110101.json", &[("1101012001", "LATIUNG")])
}
