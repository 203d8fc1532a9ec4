//! 索引问答工具 - 把一个检索索引绑定为可被智能体选择的工具

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::llm::binding::ModelBinding;
use crate::retrieval::index::RetrievalIndex;
use crate::tools::{AgentTool, ToolOutcome};

/// 索引问答工具
///
/// 描述来自索引配置，用于界定"这个索引回答哪类问题"，供模型在多个索引间选择。
pub struct QueryEngineTool {
    index: Arc<RetrievalIndex>,
    binding: Arc<dyn ModelBinding>,
}

#[derive(Debug, Deserialize)]
pub struct QueryEngineArgs {
    pub question: String,
}

impl QueryEngineTool {
    pub fn new(index: Arc<RetrievalIndex>, binding: Arc<dyn ModelBinding>) -> Self {
        Self { index, binding }
    }
}

#[async_trait]
impl AgentTool for QueryEngineTool {
    fn name(&self) -> &str {
        &self.index.name
    }

    fn description(&self) -> &str {
        &self.index.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "要在该索引中回答的问题" }
            },
            "required": ["question"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let args: QueryEngineArgs =
            serde_json::from_value(args).map_err(|e| ToolError::Execution {
                tool: self.index.name.clone(),
                cause: format!("参数解析失败: {}", e),
            })?;

        let answer = self
            .index
            .query(self.binding.as_ref(), &args.question)
            .await
            .map_err(|e| ToolError::Execution {
                tool: self.index.name.clone(),
                cause: e.to_string(),
            })?;

        Ok(ToolOutcome::success_with_sources(answer.text, answer.sources))
    }
}
