//! 管理者决策 - 指派计划、产出评审与最终整合
//!
//! 管理者是一个不执行具体检索的智能体，它的三类决策都通过结构化
//! 提取完成。计划与评审失败时系统选择宽松路径（保留预指派、视为
//! 通过），避免管理者的模型故障拖垮整个运行。

use schemars::JsonSchema;
use serde::Deserialize;

use crate::agent::Agent;
use crate::crew::task::{Task, TaskReport};
use crate::error::ModelCallError;
use crate::llm::extract::extract_structured;

/// 一条任务改派
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskAssignment {
    /// 任务序号
    pub task: usize,
    /// 执行该任务的角色名
    pub agent: String,
}

/// 管理者的任务指派计划
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ManagerPlan {
    /// 每个任务的指派
    pub assignments: Vec<TaskAssignment>,
    /// 指派理由
    pub rationale: String,
}

/// 管理者对单个任务产出的评审结论
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ManagerReview {
    /// 产出是否达到期望
    pub approved: bool,
    /// 不通过时的修订意见
    pub feedback: String,
}

fn persona_prompt(manager: &Agent) -> String {
    format!(
        "# 角色\n{}\n\n# 目标\n{}\n\n# 背景\n{}\n",
        manager.role, manager.goal, manager.backstory
    )
}

/// 让管理者审阅任务清单并给出指派计划
pub async fn plan(
    manager: &Agent,
    tasks: &[Task],
    roster: &[String],
) -> Result<ManagerPlan, ModelCallError> {
    let task_list = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}（预指派: {}）", i, t.description, t.agent_role))
        .collect::<Vec<_>>()
        .join("\n");

    let user_prompt = format!(
        "## 任务清单\n{}\n\n## 可用智能体\n{}\n\n请为每个任务确认或调整执行角色，给出完整的指派计划。",
        task_list,
        roster.join("、")
    );

    extract_structured(manager.binding(), &persona_prompt(manager), &user_prompt).await
}

/// 让管理者评审一个任务的产出
pub async fn review(
    manager: &Agent,
    task: &Task,
    output: &str,
) -> Result<ManagerReview, ModelCallError> {
    let user_prompt = format!(
        "## 任务\n{}\n\n## 期望产出\n{}\n\n## 实际产出\n{}\n\n请评审实际产出是否达到期望；不通过时给出具体的修订意见。",
        task.description, task.expected_output, output
    );

    extract_structured(manager.binding(), &persona_prompt(manager), &user_prompt).await
}

/// 让管理者把全部任务产出整合为最终报告
pub async fn consolidate(
    manager: &Agent,
    reports: &[TaskReport],
) -> Result<String, ModelCallError> {
    let sections = reports
        .iter()
        .map(|r| format!("### 任务{}: {}\n{}", r.index, r.description, r.output))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user_prompt = format!(
        "## 各任务产出\n{}\n\n请把上述产出整合为一份连贯的最终报告，保留来源引用，指出各来源之间的一致与分歧。",
        sections
    );

    manager
        .binding()
        .complete(&persona_prompt(manager), &user_prompt)
        .await
}
