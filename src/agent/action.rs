//! 智能体动作与运行誊本

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 智能体一步推理产出的动作
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentAction {
    /// 调用一个工具
    ToolCall {
        /// 工具名称
        tool: String,
        /// 工具参数
        arguments: serde_json::Value,
    },
    /// 把一个子任务委派给一名同事
    Delegate {
        /// 同事的角色名
        coworker: String,
        /// 委派的子任务描述
        task: String,
    },
    /// 给出最终答案，结束当前任务
    FinalAnswer {
        /// 最终答案正文
        text: String,
    },
}

/// 誊本条目类型
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// 智能体做出的动作
    Action,
    /// 环境返回的观察（工具结果、纠正提示、同事汇报等）
    Observation,
}

/// 誊本条目
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub at: DateTime<Utc>,
    pub kind: EntryKind,
    pub content: String,
}

/// 任务运行誊本 - 按因果顺序记录动作与观察
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_action(&mut self, action: &AgentAction) {
        let content = serde_json::to_string(action).unwrap_or_else(|_| format!("{:?}", action));
        self.entries.push(TranscriptEntry {
            at: Utc::now(),
            kind: EntryKind::Action,
            content,
        });
    }

    pub fn observe(&mut self, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            at: Utc::now(),
            kind: EntryKind::Observation,
            content: content.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// 渲染为提示词中的历史记录部分
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "（尚无历史记录）".to_string();
        }

        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let label = match entry.kind {
                    EntryKind::Action => "动作",
                    EntryKind::Observation => "观察",
                };
                format!("{}. [{}] {}", i + 1, label, entry.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
