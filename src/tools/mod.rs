//! 工具层 - 把外部能力包装为统一的可调用契约
//!
//! 每个工具有唯一名称、供模型选择的自然语言描述和JSON参数模式。
//! 调用永远不会把底层异常抛过工具边界：失败被转换为 ok=false 的
//! 结构化结果，让智能体能基于"工具说它失败了"继续推理。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

mod arxiv_search;
mod engagement;
mod pdf_download;
mod web_search;

pub use arxiv_search::AgentToolArxivSearch;
pub use engagement::AgentToolEngagement;
pub use pdf_download::AgentToolPdfDownload;
pub use web_search::AgentToolWebSearch;

/// 结构化的工具调用结果
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolOutcome {
    /// 底层能力是否执行成功
    pub ok: bool,
    /// 给智能体阅读的结果文本（成功结果或失败说明）
    pub text: String,
    /// 来源出处（链接、文档标识等）
    pub provenance: Vec<String>,
}

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            provenance: Vec::new(),
        }
    }

    pub fn success_with_sources(text: impl Into<String>, provenance: Vec<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            provenance,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
            provenance: Vec::new(),
        }
    }
}

/// 统一的工具契约
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// 工具唯一名称
    fn name(&self) -> &str;

    /// 供模型进行工具选择的描述
    fn description(&self) -> &str;

    /// 参数的JSON Schema
    fn parameters(&self) -> Value;

    /// 执行工具调用
    async fn call(&self, args: Value) -> Result<ToolOutcome, ToolError>;
}

/// 把一次工具调用的任何失败转换为 ok=false 的结果，绝不向上抛出
pub async fn dispatch(tool: &dyn AgentTool, args: Value) -> ToolOutcome {
    match tool.call(args).await {
        Ok(outcome) => outcome,
        Err(e) => ToolOutcome::failure(e.to_string()),
    }
}

/// 工具注册表 - 无状态的名称到工具的映射
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具，名称冲突是构造错误
    pub fn register(&mut self, tool: Arc<dyn AgentTool>) -> Result<(), ToolError> {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            return Err(ToolError::DuplicateToolName(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// 按名称查找工具
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// 按名称调用工具；未知工具与执行失败都以 ok=false 结果返回
    pub async fn invoke(&self, name: &str, args: Value) -> ToolOutcome {
        match self.get(name) {
            Some(tool) => dispatch(tool.as_ref(), args).await,
            None => ToolOutcome::failure(ToolError::UnknownTool(name.to_string()).to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// 总是失败的工具，用于验证错误不会越过注册表边界
    struct BrokenTool;

    #[async_trait]
    impl AgentTool for BrokenTool {
        fn name(&self) -> &str {
            "broken_tool"
        }

        fn description(&self) -> &str {
            "总是失败"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn call(&self, _args: Value) -> Result<ToolOutcome, ToolError> {
            Err(ToolError::Execution {
                tool: "broken_tool".to_string(),
                cause: "网络不可达".to_string(),
            })
        }
    }

    #[test]
    fn test_register_duplicate_name_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(BrokenTool)).unwrap();

        let result = registry.register(Arc::new(BrokenTool));
        assert!(matches!(result, Err(ToolError::DuplicateToolName(_))));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_returns_failure_outcome() {
        let registry = ToolRegistry::new();
        let outcome = registry.invoke("no_such_tool", json!({})).await;

        assert!(!outcome.ok);
        assert!(outcome.text.contains("no_such_tool"));
    }

    #[tokio::test]
    async fn test_invoke_failing_tool_never_propagates() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(BrokenTool)).unwrap();

        let outcome = registry.invoke("broken_tool", json!({})).await;
        assert!(!outcome.ok);
        assert!(outcome.text.contains("网络不可达"));
    }

    #[tokio::test]
    async fn test_engagement_tool_math() {
        let tool = AgentToolEngagement::new();
        let outcome = dispatch(
            &tool,
            json!({"likes": 120, "comments": 30, "shares": 50, "followers": 1000}),
        )
        .await;

        assert!(outcome.ok);
        assert!(outcome.text.contains("200"));
        assert!(outcome.text.contains("20.00%"));
    }

    #[tokio::test]
    async fn test_engagement_tool_zero_followers() {
        let tool = AgentToolEngagement::new();
        let outcome = dispatch(
            &tool,
            json!({"likes": 5, "comments": 1, "shares": 0, "followers": 0}),
        )
        .await;

        assert!(outcome.ok);
        assert!(outcome.text.contains("0.00%"));
    }

    #[tokio::test]
    async fn test_malformed_args_become_failure_outcome() {
        let tool = AgentToolEngagement::new();
        let outcome = dispatch(&tool, json!({"likes": "很多"})).await;

        assert!(!outcome.ok);
    }
}
