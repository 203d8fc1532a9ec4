//! 社交媒体互动率计算工具 - 纯本地计算，无副作用

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::{AgentTool, ToolOutcome};

/// 互动计算工具
#[derive(Debug, Clone, Default)]
pub struct AgentToolEngagement;

/// 互动计算参数
#[derive(Debug, Deserialize)]
pub struct EngagementArgs {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub followers: u64,
}

impl AgentToolEngagement {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for AgentToolEngagement {
    fn name(&self) -> &str {
        "calculate_engagement"
    }

    fn description(&self) -> &str {
        "计算一条社交媒体帖子的总互动量和互动率（互动量/粉丝数）。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "likes": { "type": "integer", "description": "点赞数" },
                "comments": { "type": "integer", "description": "评论数" },
                "shares": { "type": "integer", "description": "转发数" },
                "followers": { "type": "integer", "description": "粉丝数" }
            },
            "required": ["likes", "comments", "shares", "followers"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let args: EngagementArgs =
            serde_json::from_value(args).map_err(|e| ToolError::Execution {
                tool: self.name().to_string(),
                cause: format!("参数解析失败: {}", e),
            })?;

        let total = args.likes + args.comments + args.shares;
        let rate = if args.followers > 0 {
            (total as f64 / args.followers as f64) * 100.0
        } else {
            0.0
        };

        Ok(ToolOutcome::success(format!(
            "总互动量为 {}，互动率为 {:.2}%。",
            total, rate
        )))
    }
}
