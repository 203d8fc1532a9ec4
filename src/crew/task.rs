//! 任务定义与任务报告

use serde::Serialize;

/// 任务生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// 编排中的一个任务
///
/// depends_on 只允许指向序号更小的任务，依赖图因此天然无环。
#[derive(Debug, Clone)]
pub struct Task {
    /// 任务描述
    pub description: String,
    /// 期望产出的说明
    pub expected_output: String,
    /// 预指派的执行角色；层级模式下管理者可以改派
    pub agent_role: String,
    /// 前置任务的序号，产出会注入本任务的上下文
    pub depends_on: Vec<usize>,
    /// 生命周期状态，由编排层推进：Pending → Running → Completed | Failed
    pub status: TaskStatus,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent_role: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent_role: agent_role.into(),
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
        }
    }

    pub fn depends_on(mut self, deps: Vec<usize>) -> Self {
        self.depends_on = deps;
        self
    }
}

/// 单个任务的执行报告
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// 任务在计划中的序号
    pub index: usize,
    /// 任务描述
    pub description: String,
    /// 实际执行的角色
    pub agent_role: String,
    /// 终态
    pub status: TaskStatus,
    /// 任务产出（失败时为失败说明）
    pub output: String,
    /// 经历的修订轮数
    pub revisions: u32,
}
