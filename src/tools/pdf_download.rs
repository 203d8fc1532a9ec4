//! arXiv论文PDF下载工具

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::{AgentTool, ToolOutcome};

/// PDF下载工具 - 有副作用（写入下载目录），调用方不应假定幂等
#[derive(Debug, Clone)]
pub struct AgentToolPdfDownload {
    download_dir: PathBuf,
    http: reqwest::Client,
}

/// PDF下载参数
#[derive(Debug, Deserialize)]
pub struct PdfDownloadArgs {
    pub link: String,
}

impl AgentToolPdfDownload {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            download_dir,
            http: reqwest::Client::new(),
        }
    }

    fn execution_error(&self, cause: impl std::fmt::Display) -> ToolError {
        ToolError::Execution {
            tool: self.name().to_string(),
            cause: cause.to_string(),
        }
    }

    /// 从abs链接推导pdf链接与落盘文件名
    fn resolve_target(&self, link: &str) -> (String, PathBuf) {
        let pdf_url = link.replace("/abs/", "/pdf/");
        let file_stem = pdf_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("paper")
            .to_string();
        let file_path = self.download_dir.join(format!("{}.pdf", file_stem));
        (pdf_url, file_path)
    }
}

#[async_trait]
impl AgentTool for AgentToolPdfDownload {
    fn name(&self) -> &str {
        "download_arxiv_pdf"
    }

    fn description(&self) -> &str {
        "下载一篇arXiv论文的PDF到本地下载目录，只接受arxiv.org的论文链接。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "link": { "type": "string", "description": "arXiv论文链接（abs或pdf链接均可）" }
            },
            "required": ["link"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let args: PdfDownloadArgs =
            serde_json::from_value(args).map_err(|e| self.execution_error(e))?;

        if !args.link.contains("arxiv.org") {
            return Ok(ToolOutcome::failure(format!(
                "提供的链接不是有效的arXiv链接: {}",
                args.link
            )));
        }

        let (pdf_url, file_path) = self.resolve_target(&args.link);

        let response = self
            .http
            .get(&pdf_url)
            .send()
            .await
            .map_err(|e| self.execution_error(e))?;

        if !response.status().is_success() {
            return Err(self.execution_error(format!("下载返回状态 {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| self.execution_error(e))?;

        std::fs::create_dir_all(&self.download_dir).map_err(|e| self.execution_error(e))?;
        std::fs::write(&file_path, &bytes).map_err(|e| self.execution_error(e))?;

        Ok(ToolOutcome::success_with_sources(
            format!("已下载 {} 到 {}", pdf_url, file_path.display()),
            vec![args.link],
        ))
    }
}
