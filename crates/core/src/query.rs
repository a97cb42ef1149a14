use serde::{Deserialize, Serialize};

use crate::model::log::{LogEntry, LogPreview};

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: usize,
    pub function_name: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            function_name: None,
        }
    }
}

impl LogQuery {
    pub fn for_function(function_name: impl Into<String>, limit: usize) -> Self {
        Self {
            limit,
            function_name: Some(function_name.into()),
        }
    }
}

/// Query-string shape of `GET /api/logs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub function_name: Option<String>,
    #[serde(default)]
    pub preview: bool,
}

impl ListParams {
    pub fn to_query(&self, default_limit: usize) -> LogQuery {
        LogQuery {
            limit: self.limit.unwrap_or(default_limit),
            function_name: self
                .function_name
                .clone()
                .filter(|name| !name.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LogsResponse {
    Entries(Vec<LogEntry>),
    Previews(Vec<LogPreview>),
}

impl LogsResponse {
    pub fn from_entries(entries: Vec<LogEntry>, preview: bool) -> Self {
        if preview {
            Self::Previews(entries.iter().map(LogEntry::preview).collect())
        } else {
            Self::Entries(entries)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Entries(v) => v.len(),
            Self::Previews(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub total_count: usize,
    pub distinct_function_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub total_logs: usize,
    pub unique_functions: usize,
    pub function_names: Vec<String>,
}

impl From<StoreStats> for StatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            total_logs: stats.total_count,
            unique_functions: stats.distinct_function_names.len(),
            function_names: stats.distinct_function_names,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestResponse {
    pub status: String,
    pub logs_added: usize,
    pub total_logs_in_storage: usize,
}

impl IngestResponse {
    pub fn success(logs_added: usize, total_logs_in_storage: usize) -> Self {
        Self {
            status: "success".to_string(),
            logs_added,
            total_logs_in_storage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: detail.into(),
        }
    }
}
