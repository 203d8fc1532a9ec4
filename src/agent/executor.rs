//! 任务执行器 - 智能体的有界动作循环
//!
//! 每个任务最多执行配置上限次动作，超出预算仍无最终答案即任务失败。
//! 工具失败与模型失败都作为观察写回誊本，让智能体在下一步自行调整；
//! 委派的接收方没有再委派的权限，委派深度在结构上固定为一层。

use std::sync::Arc;

use serde_json::Value;

use crate::agent::Agent;
use crate::agent::action::{AgentAction, Transcript};
use crate::error::{CrewError, ModelCallError};
use crate::llm::extract::extract_structured;
use crate::tools::{ToolOutcome, dispatch};

/// 一次任务执行的输入
#[derive(Debug, Clone)]
pub struct TaskBrief {
    /// 任务描述
    pub description: String,
    /// 期望产出的说明
    pub expected_output: String,
    /// 前序任务产出等上下文
    pub context: String,
    /// 管理者的修订意见（仅修订轮次存在）
    pub feedback: Option<String>,
}

impl TaskBrief {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            context: String::new(),
            feedback: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

impl Agent {
    /// 执行任务，返回最终答案文本
    ///
    /// 耗尽动作预算仍未产出最终答案时报 TaskFailure。
    pub async fn execute_task(
        &self,
        brief: &TaskBrief,
        coworkers: &[Arc<Agent>],
        budget: usize,
    ) -> Result<String, CrewError> {
        if self.verbose {
            println!("🤖 [{}] 开始执行任务: {}", self.role, summary_line(&brief.description));
        }

        if !self.allow_delegation || coworkers.is_empty() {
            return self.run_action_loop(brief, budget).await;
        }

        let coworker_names: Vec<String> = coworkers.iter().map(|c| c.role.clone()).collect();
        let mut transcript = seeded_transcript(brief);

        for _ in 0..budget {
            let action = match self.next_action(brief, &transcript, true, &coworker_names).await {
                Ok(action) => action,
                Err(e) => {
                    transcript.observe(format!("模型调用失败，请调整后重试: {}", e));
                    continue;
                }
            };
            transcript.record_action(&action);

            match action {
                AgentAction::FinalAnswer { text } => return Ok(text),
                AgentAction::ToolCall { tool, arguments } => {
                    let observation = self.observe_tool_call(&tool, arguments).await;
                    transcript.observe(observation);
                }
                AgentAction::Delegate { coworker, task } => {
                    match coworkers.iter().find(|c| c.role == coworker) {
                        Some(worker) => {
                            if self.verbose {
                                println!("   📨 [{}] 委派给 [{}]: {}", self.role, coworker, summary_line(&task));
                            }
                            let sub_brief = TaskBrief::new(task, "完成委派的子任务并汇报结果")
                                .with_context(brief.context.clone());
                            // 接收方走无委派循环，杜绝委派链
                            match worker.run_action_loop(&sub_brief, budget).await {
                                Ok(report) => transcript
                                    .observe(format!("同事「{}」的汇报:\n{}", coworker, report)),
                                Err(e) => transcript
                                    .observe(format!("同事「{}」未能完成委派: {}", coworker, e)),
                            }
                        }
                        None => transcript.observe(format!(
                            "找不到同事「{}」，可委派的同事: {}",
                            coworker,
                            coworker_names.join("、")
                        )),
                    }
                }
            }
        }

        Err(CrewError::TaskFailure {
            role: self.role.clone(),
        })
    }

    /// 无委派的动作循环，委派动作会被纠正提示驳回
    pub(crate) async fn run_action_loop(
        &self,
        brief: &TaskBrief,
        budget: usize,
    ) -> Result<String, CrewError> {
        let mut transcript = seeded_transcript(brief);

        for _ in 0..budget {
            let action = match self.next_action(brief, &transcript, false, &[]).await {
                Ok(action) => action,
                Err(e) => {
                    transcript.observe(format!("模型调用失败，请调整后重试: {}", e));
                    continue;
                }
            };
            transcript.record_action(&action);

            match action {
                AgentAction::FinalAnswer { text } => return Ok(text),
                AgentAction::ToolCall { tool, arguments } => {
                    let observation = self.observe_tool_call(&tool, arguments).await;
                    transcript.observe(observation);
                }
                AgentAction::Delegate { .. } => {
                    transcript
                        .observe("你没有委派权限，请使用自己的工具完成任务或给出最终答案。");
                }
            }
        }

        Err(CrewError::TaskFailure {
            role: self.role.clone(),
        })
    }

    /// 让模型基于誊本决定下一个动作
    async fn next_action(
        &self,
        brief: &TaskBrief,
        transcript: &Transcript,
        permit_delegation: bool,
        coworker_names: &[String],
    ) -> Result<AgentAction, ModelCallError> {
        let system_prompt = self.system_prompt(permit_delegation, coworker_names);
        let user_prompt = render_user_prompt(brief, transcript);
        extract_structured::<AgentAction>(self.binding(), &system_prompt, &user_prompt).await
    }

    /// 调用工具并把结果渲染为观察文本；未知工具与执行失败同样是观察
    async fn observe_tool_call(&self, tool: &str, arguments: Value) -> String {
        if self.verbose {
            println!("   🔧 [{}] 调用工具 {}@{}", self.role, tool, arguments);
        }

        let outcome = match self.find_tool(tool) {
            Some(tool) => dispatch(tool.as_ref(), arguments).await,
            None => ToolOutcome::failure(format!(
                "未知工具「{}」，可用工具: {}",
                tool,
                self.tools()
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join("、")
            )),
        };

        if outcome.ok {
            if outcome.provenance.is_empty() {
                format!("工具 {} 返回:\n{}", tool, outcome.text)
            } else {
                format!(
                    "工具 {} 返回:\n{}\n来源: {}",
                    tool,
                    outcome.text,
                    outcome.provenance.join("；")
                )
            }
        } else {
            format!("工具 {} 调用失败: {}", tool, outcome.text)
        }
    }
}

fn seeded_transcript(brief: &TaskBrief) -> Transcript {
    let mut transcript = Transcript::new();
    if let Some(feedback) = &brief.feedback {
        transcript.observe(format!("管理者修订意见: {}", feedback));
    }
    transcript
}

fn render_user_prompt(brief: &TaskBrief, transcript: &Transcript) -> String {
    let mut prompt = format!(
        "## 任务\n{}\n\n## 期望产出\n{}\n",
        brief.description, brief.expected_output
    );
    if !brief.context.is_empty() {
        prompt.push_str(&format!("\n## 上下文（前序任务产出）\n{}\n", brief.context));
    }
    prompt.push_str(&format!("\n## 历史记录\n{}\n\n请给出下一个动作。", transcript.render()));
    prompt
}

/// 控制台进度用的单行摘要
fn summary_line(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default();
    let truncated: String = first.chars().take(60).collect();
    if truncated.chars().count() < first.chars().count() {
        format!("{}…", truncated)
    } else {
        truncated
    }
}
