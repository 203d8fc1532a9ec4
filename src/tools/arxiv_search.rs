//! arXiv文献检索工具 - 调用arXiv Atom API并抽取条目字段

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::SearchConfig;
use crate::error::ToolError;
use crate::tools::{AgentTool, ToolOutcome};

/// arXiv检索工具
#[derive(Debug, Clone)]
pub struct AgentToolArxivSearch {
    config: SearchConfig,
    http: reqwest::Client,
}

/// arXiv检索参数
#[derive(Debug, Deserialize)]
pub struct ArxivSearchArgs {
    pub query: String,
    pub max_results: Option<usize>,
}

/// 从Atom响应中抽取出的一条论文记录
#[derive(Debug)]
struct ArxivEntry {
    title: String,
    summary: String,
    link: String,
}

impl AgentToolArxivSearch {
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

    /// Atom响应是结构固定的XML，这里直接按<entry>块抽取字段
    fn parse_entries(&self, body: &str) -> Result<Vec<ArxivEntry>, ToolError> {
        let entry_re =
            Regex::new(r"(?s)<entry>(.*?)</entry>").map_err(|e| self.execution_error(e))?;
        let title_re =
            Regex::new(r"(?s)<title>(.*?)</title>").map_err(|e| self.execution_error(e))?;
        let summary_re =
            Regex::new(r"(?s)<summary>(.*?)</summary>").map_err(|e| self.execution_error(e))?;
        let id_re = Regex::new(r"(?s)<id>(.*?)</id>").map_err(|e| self.execution_error(e))?;

        let mut entries = Vec::new();
        for cap in entry_re.captures_iter(body) {
            let block = &cap[1];
            let field = |re: &Regex| {
                re.captures(block)
                    .map(|c| normalize_whitespace(&c[1]))
                    .unwrap_or_default()
            };

            entries.push(ArxivEntry {
                title: field(&title_re),
                summary: field(&summary_re),
                link: field(&id_re),
            });
        }
        Ok(entries)
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl AgentTool for AgentToolArxivSearch {
    fn name(&self) -> &str {
        "search_arxiv_papers"
    }

    fn description(&self) -> &str {
        "在arXiv论文数据库中按主题检索学术论文，返回论文的标题、摘要和链接。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "检索主题或关键词" },
                "max_results": { "type": "integer", "description": "最大返回条目数（默认取配置值）" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let args: ArxivSearchArgs =
            serde_json::from_value(args).map_err(|e| self.execution_error(e))?;
        let max_results = args.max_results.unwrap_or(self.config.arxiv_max_results);

        let response = self
            .http
            .get(&self.config.arxiv_api_base_url)
            .query(&[
                ("search_query", format!("all:{}", args.query)),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.execution_error(e))?;

        if !response.status().is_success() {
            return Err(self.execution_error(format!("arXiv API返回状态 {}", response.status())));
        }

        let body = response.text().await.map_err(|e| self.execution_error(e))?;
        let entries = self.parse_entries(&body)?;

        if entries.is_empty() {
            return Ok(ToolOutcome::success(format!(
                "未在arXiv上找到与「{}」相关的论文。",
                args.query
            )));
        }

        let provenance: Vec<String> = entries.iter().map(|e| e.link.clone()).collect();
        let text = entries
            .iter()
            .map(|e| format!("标题: {}\n摘要: {}\n链接: {}", e.title, e.summary, e.link))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ToolOutcome::success_with_sources(text, provenance))
    }
}
