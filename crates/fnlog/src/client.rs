use anyhow::Context;
use fnlog_core::config::Config;
use fnlog_core::model::log::LogEntry;
use fnlog_core::query::{ErrorResponse, ListParams, LogsResponse, StatsResponse};
use serde::de::DeserializeOwned;

/// Thin client for the query HTTP API of a running `fnlog run`.
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
}

impl QueryClient {
    /// `--addr` wins over the `FNLOG_*` environment and the config default.
    pub fn new(addr: Option<String>) -> Self {
        let addr =
            addr.unwrap_or_else(|| Config::from_env().unwrap_or_default().query_http_addr);
        let base_url = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{addr}")
        };
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn list(&self, params: &ListParams) -> anyhow::Result<LogsResponse> {
        let mut query: Vec<(&str, String)> = vec![("preview", params.preview.to_string())];
        if let Some(limit) = params.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(name) = &params.function_name {
            query.push(("function_name", name.clone()));
        }
        let req = self.http.get(self.url("/api/logs")).query(&query);
        self.fetch(req, "list logs").await
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<LogEntry> {
        let req = self.http.get(self.url(&format!("/api/logs/{id}")));
        self.fetch(req, "get log").await
    }

    pub async fn stats(&self) -> anyhow::Result<StatsResponse> {
        let req = self.http.get(self.url("/api/stats"));
        self.fetch(req, "fetch stats").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> anyhow::Result<T> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("{what}: connect query server {}", self.base_url))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorResponse>()
                .await
                .map(|e| e.detail)
                .unwrap_or_else(|_| "no detail".to_string());
            anyhow::bail!("{what} failed with status {status}: {detail}");
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("{what}: decode response"))
    }
}
