//! 网络检索工具 - 基于Tavily搜索服务

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::SearchConfig;
use crate::error::ToolError;
use crate::tools::{AgentTool, ToolOutcome};

/// 网络检索工具
#[derive(Debug, Clone)]
pub struct AgentToolWebSearch {
    config: SearchConfig,
    http: reqwest::Client,
}

/// 网络检索参数
#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

impl AgentToolWebSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn execution_error(&self, cause: impl std::fmt::Display) -> ToolError {
        ToolError::Execution {
            tool: self.name().to_string(),
            cause: cause.to_string(),
        }
    }
}

#[async_trait]
impl AgentTool for AgentToolWebSearch {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "在互联网上检索最新信息，返回带来源链接的内容摘要。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "检索内容" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let args: WebSearchArgs =
            serde_json::from_value(args).map_err(|e| self.execution_error(e))?;

        if self.config.tavily_api_key.trim().is_empty() {
            return Err(self.execution_error("TAVILY_API_KEY 未配置"));
        }

        let url = format!(
            "{}/search",
            self.config.tavily_api_base_url.trim_end_matches('/')
        );
        let body = json!({
            "api_key": self.config.tavily_api_key,
            "query": args.query,
            "max_results": self.config.max_results,
            "search_depth": self.config.search_depth,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.execution_error(e))?;

        if !response.status().is_success() {
            return Err(self.execution_error(format!("搜索服务返回状态 {}", response.status())));
        }

        let payload: Value = response.json().await.map_err(|e| self.execution_error(e))?;
        let results = payload
            .get("results")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        if results.is_empty() {
            return Ok(ToolOutcome::success(format!(
                "网络检索未找到与「{}」相关的内容。",
                args.query
            )));
        }

        let mut provenance = Vec::new();
        let mut snippets = Vec::new();
        for result in &results {
            let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let content = result.get("content").and_then(|v| v.as_str()).unwrap_or("");
            if !url.is_empty() {
                provenance.push(url.to_string());
            }
            snippets.push(format!("• 来源: {}\n内容: {}", url, content));
        }

        Ok(ToolOutcome::success_with_sources(
            format!("检索结果:\n{}", snippets.join("\n---\n")),
            provenance,
        ))
    }
}
