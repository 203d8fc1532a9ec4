//! 智能体 - 角色化的推理单元
//!
//! 每个智能体由角色、目标、背景故事和一组工具构成。执行任务时在
//! 有界动作循环中反复决策：调用工具、委派同事或给出最终答案。

use std::sync::Arc;

use crate::error::CrewError;
use crate::llm::binding::ModelBinding;
use crate::tools::AgentTool;

pub mod action;
mod executor;

pub use action::{AgentAction, Transcript};
pub use executor::TaskBrief;

/// 角色化智能体
pub struct Agent {
    /// 角色名，在编队名册中唯一
    pub role: String,
    /// 任务目标
    pub goal: String,
    /// 背景故事，用于塑造回答口吻与专业视角
    pub backstory: String,
    /// 是否允许向同事委派子任务
    pub allow_delegation: bool,
    tools: Vec<Arc<dyn AgentTool>>,
    binding: Arc<dyn ModelBinding>,
    verbose: bool,
}

impl Agent {
    /// 构建智能体；工具集中出现重名是构造错误
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        tools: Vec<Arc<dyn AgentTool>>,
        allow_delegation: bool,
        binding: Arc<dyn ModelBinding>,
    ) -> Result<Self, CrewError> {
        let role = role.into();

        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(CrewError::DuplicateTool {
                    role,
                    tool: tool.name().to_string(),
                });
            }
        }

        Ok(Self {
            role,
            goal: goal.into(),
            backstory: backstory.into(),
            allow_delegation,
            tools,
            binding,
            verbose: false,
        })
    }

    /// 开启后在控制台输出每一步动作与工具调用的进度明细
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn tools(&self) -> &[Arc<dyn AgentTool>] {
        &self.tools
    }

    pub(crate) fn binding(&self) -> &dyn ModelBinding {
        self.binding.as_ref()
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// 组装角色系统提示词
    fn system_prompt(&self, permit_delegation: bool, coworkers: &[String]) -> String {
        let mut prompt = format!(
            "# 角色\n{}\n\n# 目标\n{}\n\n# 背景\n{}\n",
            self.role, self.goal, self.backstory
        );

        if self.tools.is_empty() {
            prompt.push_str("\n## 可用工具\n（无工具，依靠自身推理完成任务）\n");
        } else {
            prompt.push_str("\n## 可用工具\n");
            for tool in &self.tools {
                prompt.push_str(&format!(
                    "- {}: {}\n  参数模式: {}\n",
                    tool.name(),
                    tool.description(),
                    tool.parameters()
                ));
            }
        }

        prompt.push_str(
            "\n## 行动规则\n每一步只输出一个动作：\n\
             - tool_call：调用一个可用工具\n\
             - final_answer：任务完成，给出最终答案\n",
        );

        if permit_delegation && !coworkers.is_empty() {
            prompt.push_str(&format!(
                "- delegate：把子任务委派给一名同事，coworker 取值范围：{}\n",
                coworkers.join("、")
            ));
        } else {
            prompt.push_str("你不能委派任务，必须依靠自己的工具与推理完成。\n");
        }

        prompt
    }
}
