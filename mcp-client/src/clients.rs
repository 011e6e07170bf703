//! Typed, per-service convenience wrappers over [`McpClient::execute`].
//! Each method just names the operation and shapes the arguments; all of
//! them share the same cache/health/fallback/metrics behavior.

use std::sync::Arc;

use qe_core::McpResult;
use serde_json::json;

use crate::client::McpClient;

pub struct GitHubClient {
    client: Arc<McpClient>,
    server_id: String,
}

impl GitHubClient {
    pub fn new(client: Arc<McpClient>, server_id: impl Into<String>) -> Self {
        Self {
            client,
            server_id: server_id.into(),
        }
    }

    pub async fn get_pull_request(&self, repo: &str, number: u64) -> McpResult {
        self.client
            .execute(&self.server_id, "github_get_pull_request", json!({ "repo": repo, "number": number }))
            .await
    }

    pub async fn search_repositories(&self, query: &str, limit: u32) -> McpResult {
        self.client
            .execute(&self.server_id, "github_search_repositories", json!({ "query": query, "limit": limit }))
            .await
    }
}

pub struct JenkinsClient {
    client: Arc<McpClient>,
    server_id: String,
}

impl JenkinsClient {
    pub fn new(client: Arc<McpClient>, server_id: impl Into<String>) -> Self {
        Self {
            client,
            server_id: server_id.into(),
        }
    }

    pub async fn get_build(&self, job_path: &str, build_number: &str) -> McpResult {
        self.client
            .execute(&self.server_id, "jenkins_get_build", json!({ "job_path": job_path, "build_number": build_number }))
            .await
    }

    pub async fn get_console(&self, job_path: &str, build_number: &str) -> McpResult {
        self.client
            .execute(&self.server_id, "jenkins_get_console", json!({ "job_path": job_path, "build_number": build_number }))
            .await
    }

    pub async fn get_test_report(&self, job_path: &str, build_number: &str) -> McpResult {
        self.client
            .execute(&self.server_id, "jenkins_get_test_report", json!({ "job_path": job_path, "build_number": build_number }))
            .await
    }
}

pub struct FilesystemClient {
    client: Arc<McpClient>,
    server_id: String,
}

impl FilesystemClient {
    pub fn new(client: Arc<McpClient>, server_id: impl Into<String>) -> Self {
        Self {
            client,
            server_id: server_id.into(),
        }
    }

    pub async fn read_file(&self, path: &str) -> McpResult {
        self.client.execute(&self.server_id, "filesystem_read_file", json!({ "path": path })).await
    }

    pub async fn search_files(&self, pattern: &str, max_results: u32) -> McpResult {
        self.client
            .execute(&self.server_id, "filesystem_search_files", json!({ "pattern": pattern, "max_results": max_results }))
            .await
    }
}

pub struct JiraClient {
    client: Arc<McpClient>,
    server_id: String,
}

impl JiraClient {
    pub fn new(client: Arc<McpClient>, server_id: impl Into<String>) -> Self {
        Self {
            client,
            server_id: server_id.into(),
        }
    }

    pub async fn get_issue(&self, ticket_id: &str) -> McpResult {
        self.client.execute(&self.server_id, "jira_get_issue", json!({ "ticket_id": ticket_id })).await
    }
}

pub struct EnvironmentClient {
    client: Arc<McpClient>,
    server_id: String,
}

impl EnvironmentClient {
    pub fn new(client: Arc<McpClient>, server_id: impl Into<String>) -> Self {
        Self {
            client,
            server_id: server_id.into(),
        }
    }

    pub async fn check_health(&self, cluster: &str) -> McpResult {
        self.client.execute(&self.server_id, "environment_check_health", json!({ "cluster": cluster })).await
    }

    pub async fn get_console_logs(&self, cluster: &str, namespace: &str) -> McpResult {
        self.client
            .execute(&self.server_id, "environment_get_console_logs", json!({ "cluster": cluster, "namespace": namespace }))
            .await
    }
}
