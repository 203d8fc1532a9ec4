//! 编排层 - 把智能体名册与任务计划组织为一次可执行的运行
//!
//! 顺序模式按任务序号严格串行执行并链式传递上下文；层级模式由管理者
//! 确认指派、评审产出并整合最终报告，互不依赖的任务并发执行。
//! 单个任务失败不会中止运行：失败说明作为该任务的产出继续向下游传递，
//! 最终体现在运行状态与任务报告里。

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::{Agent, TaskBrief};
use crate::config::CrewConfig;
use crate::error::CrewError;
use crate::memory::Memory;

pub mod manager;
pub mod task;

pub use task::{Task, TaskReport, TaskStatus};

/// 编排模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMode {
    /// 按序号串行执行，上下文逐级传递
    Sequential,
    /// 管理者指派、评审并整合，独立任务并发执行
    Hierarchical,
}

/// 运行终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

/// 一次编排运行的产出
#[derive(Debug)]
pub struct CrewOutput {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// 最终结果文本
    pub result: String,
    /// 各任务的执行报告
    pub reports: Vec<TaskReport>,
}

/// 智能体编队
pub struct Crew {
    agents: Vec<Arc<Agent>>,
    manager: Option<Arc<Agent>>,
    tasks: Vec<Task>,
    mode: ProcessMode,
    config: CrewConfig,
    memory: Memory,
    verbose: bool,
}

impl Crew {
    /// 构建编队并校验名册与任务计划
    pub fn new(
        agents: Vec<Agent>,
        manager: Option<Agent>,
        tasks: Vec<Task>,
        mode: ProcessMode,
        config: CrewConfig,
    ) -> Result<Self, CrewError> {
        for (i, agent) in agents.iter().enumerate() {
            if agents[..i].iter().any(|a| a.role == agent.role) {
                return Err(CrewError::DuplicateRole(agent.role.clone()));
            }
        }
        if let Some(manager) = &manager
            && agents.iter().any(|a| a.role == manager.role)
        {
            return Err(CrewError::DuplicateRole(manager.role.clone()));
        }

        for task in &tasks {
            if !agents.iter().any(|a| a.role == task.agent_role) {
                return Err(CrewError::UnknownAgent(task.agent_role.clone()));
            }
        }

        if mode == ProcessMode::Hierarchical && manager.is_none() {
            return Err(CrewError::MissingManager);
        }

        Ok(Self {
            agents: agents.into_iter().map(Arc::new).collect(),
            manager: manager.map(Arc::new),
            tasks,
            mode,
            config,
            memory: Memory::new(),
            verbose: false,
        })
    }

    /// 开启后输出任务级的进度明细（完成、评审、修订）
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub(crate) fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// 各任务当前的生命周期状态，按任务序号排列
    pub fn task_statuses(&self) -> Vec<TaskStatus> {
        self.tasks.iter().map(|t| t.status).collect()
    }

    /// 启动运行
    ///
    /// 返回 Err 只发生在取消与构造级缺陷上；任务层面的失败体现在
    /// 运行状态与任务报告中，调用方总能拿到一份结果文本。
    pub async fn kickoff(&mut self, cancel: CancellationToken) -> Result<CrewOutput, CrewError> {
        if cancel.is_cancelled() {
            return Err(CrewError::Cancelled);
        }

        let run_id = Uuid::new_v4();
        let mode_name = match self.mode {
            ProcessMode::Sequential => "顺序",
            ProcessMode::Hierarchical => "层级",
        };
        println!("🚀 编排启动 {}（{}模式，{}个任务）", run_id, mode_name, self.tasks.len());

        let output = match self.mode {
            ProcessMode::Sequential => self.run_sequential(run_id, &cancel).await?,
            ProcessMode::Hierarchical => self.run_hierarchical(run_id, &cancel).await?,
        };

        println!("🏁 编排完成 {}", run_id);
        Ok(output)
    }

    fn agent_by_role(&self, role: &str) -> Option<Arc<Agent>> {
        self.agents.iter().find(|a| a.role == role).cloned()
    }

    fn coworkers_of(&self, role: &str) -> Vec<Arc<Agent>> {
        self.agents
            .iter()
            .filter(|a| a.role != role)
            .cloned()
            .collect()
    }

    /// 汇集指定前置任务的产出作为上下文
    fn context_for(&mut self, deps: &[usize]) -> String {
        let mut sections = Vec::new();
        for dep in deps {
            if let Some(output) = self.memory.get::<String>("task_outputs", &dep.to_string()) {
                sections.push(format!("### 前序任务{}的产出\n{}", dep, output));
            }
        }
        sections.join("\n\n")
    }

    async fn run_sequential(
        &mut self,
        run_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<CrewOutput, CrewError> {
        let mut reports = Vec::with_capacity(self.tasks.len());

        for index in 0..self.tasks.len() {
            if cancel.is_cancelled() {
                return Err(CrewError::Cancelled);
            }

            self.tasks[index].status = TaskStatus::Running;
            let task = self.tasks[index].clone();
            let agent = self
                .agent_by_role(&task.agent_role)
                .ok_or_else(|| CrewError::UnknownAgent(task.agent_role.clone()))?;

            // 顺序模式下所有前序任务的产出都是上下文
            let deps: Vec<usize> = (0..index).collect();
            let context = self.context_for(&deps);
            let brief = TaskBrief::new(&task.description, &task.expected_output)
                .with_context(context);

            let (status, output) = match agent
                .execute_task(&brief, &[], self.config.max_actions_per_task)
                .await
            {
                Ok(output) => {
                    if self.verbose {
                        println!("✅ 任务{}完成", index);
                    }
                    (TaskStatus::Completed, output)
                }
                Err(e) => {
                    eprintln!("⚠️ 任务{}失败: {}", index, e);
                    (TaskStatus::Failed, e.to_string())
                }
            };
            self.tasks[index].status = status;

            if let Err(e) = self
                .memory
                .store("task_outputs", &index.to_string(), &output)
            {
                eprintln!("⚠️ 任务{}的产出写入记忆失败: {}", index, e);
            }
            reports.push(TaskReport {
                index,
                description: task.description,
                agent_role: task.agent_role,
                status,
                output,
                revisions: 0,
            });
        }

        // 末位任务决定运行终态；中途任务的失败说明已经进入下游上下文
        let failed = reports
            .last()
            .is_some_and(|r| r.status == TaskStatus::Failed);
        let result = reports
            .last()
            .map(|r| r.output.clone())
            .unwrap_or_default();

        Ok(CrewOutput {
            run_id,
            status: if failed { RunStatus::Failed } else { RunStatus::Completed },
            result,
            reports,
        })
    }

    async fn run_hierarchical(
        &mut self,
        run_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<CrewOutput, CrewError> {
        let manager = self.manager.clone().ok_or(CrewError::MissingManager)?;
        let roster: Vec<String> = self.agents.iter().map(|a| a.role.clone()).collect();

        // 指派计划；计划失败或无效改派时保留预指派
        let mut assignments: Vec<String> =
            self.tasks.iter().map(|t| t.agent_role.clone()).collect();
        match manager::plan(&manager, &self.tasks, &roster).await {
            Ok(plan) => {
                println!("📋 管理者指派计划: {}", plan.rationale);
                if let Err(e) = self.memory.store("manager", "plan", &plan.rationale) {
                    eprintln!("⚠️ 指派计划写入记忆失败: {}", e);
                }
                for assignment in plan.assignments {
                    if assignment.task < assignments.len()
                        && roster.contains(&assignment.agent)
                    {
                        assignments[assignment.task] = assignment.agent;
                    } else {
                        eprintln!(
                            "⚠️ 忽略无效改派: 任务{} -> {}",
                            assignment.task, assignment.agent
                        );
                    }
                }
            }
            Err(e) => eprintln!("⚠️ 指派计划生成失败，保留预指派: {}", e),
        }

        let total = self.tasks.len();
        let mut slots: Vec<Option<TaskReport>> = (0..total).map(|_| None).collect();
        let mut done = vec![false; total];

        while done.iter().any(|d| !d) {
            if cancel.is_cancelled() {
                return Err(CrewError::Cancelled);
            }

            let ready: Vec<usize> = (0..total)
                .filter(|&i| {
                    !done[i]
                        && self.tasks[i]
                            .depends_on
                            .iter()
                            .all(|&d| d < total && done[d])
                })
                .collect();

            if ready.is_empty() {
                // 依赖指向不存在或永远无法完成的任务
                let pending: Vec<usize> = (0..total).filter(|&i| !done[i]).collect();
                for i in pending {
                    done[i] = true;
                    self.tasks[i].status = TaskStatus::Failed;
                    slots[i] = Some(TaskReport {
                        index: i,
                        description: self.tasks[i].description.clone(),
                        agent_role: assignments[i].clone(),
                        status: TaskStatus::Failed,
                        output: "任务依赖无法满足，未执行".to_string(),
                        revisions: 0,
                    });
                }
                break;
            }

            let mut stage = Vec::with_capacity(ready.len());
            for &i in &ready {
                self.tasks[i].status = TaskStatus::Running;
                let task = self.tasks[i].clone();
                let role = assignments[i].clone();
                let agent = self
                    .agent_by_role(&role)
                    .ok_or_else(|| CrewError::UnknownAgent(role.clone()))?;
                let coworkers = self.coworkers_of(&role);
                let context = self.context_for(&task.depends_on);
                stage.push(run_reviewed_task(
                    i,
                    task,
                    role,
                    agent,
                    coworkers,
                    context,
                    manager.clone(),
                    self.config.max_actions_per_task,
                    self.config.revision_cap,
                    self.verbose,
                ));
            }

            for report in join_all(stage).await {
                if let Err(e) = self
                    .memory
                    .store("task_outputs", &report.index.to_string(), &report.output)
                {
                    eprintln!("⚠️ 任务{}的产出写入记忆失败: {}", report.index, e);
                }
                let index = report.index;
                done[index] = true;
                self.tasks[index].status = report.status;
                slots[index] = Some(report);
            }
        }

        let reports: Vec<TaskReport> = slots.into_iter().flatten().collect();
        let mut failed = reports.iter().any(|r| r.status == TaskStatus::Failed);

        let result = match manager::consolidate(&manager, &reports).await {
            Ok(text) => text,
            Err(e) => {
                eprintln!("⚠️ 最终整合失败，返回各任务产出汇总: {}", e);
                failed = true;
                reports
                    .iter()
                    .map(|r| format!("### 任务{}: {}\n{}", r.index, r.description, r.output))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        };

        Ok(CrewOutput {
            run_id,
            status: if failed { RunStatus::Failed } else { RunStatus::Completed },
            result,
            reports,
        })
    }
}

/// 执行单个任务并接受管理者评审，修订超过上限即任务失败
#[allow(clippy::too_many_arguments)]
async fn run_reviewed_task(
    index: usize,
    task: Task,
    role: String,
    agent: Arc<Agent>,
    coworkers: Vec<Arc<Agent>>,
    context: String,
    manager: Arc<Agent>,
    max_actions: usize,
    revision_cap: u32,
    verbose: bool,
) -> TaskReport {
    let mut feedback: Option<String> = None;
    let mut revisions = 0u32;

    loop {
        let mut brief = TaskBrief::new(&task.description, &task.expected_output)
            .with_context(context.clone());
        if let Some(fb) = &feedback {
            brief = brief.with_feedback(fb.clone());
        }

        let output = match agent.execute_task(&brief, &coworkers, max_actions).await {
            Ok(output) => output,
            Err(e) => {
                eprintln!("⚠️ 任务{}失败: {}", index, e);
                return TaskReport {
                    index,
                    description: task.description,
                    agent_role: role,
                    status: TaskStatus::Failed,
                    output: e.to_string(),
                    revisions,
                };
            }
        };

        match manager::review(&manager, &task, &output).await {
            Ok(review) if review.approved => {
                if verbose {
                    println!("✅ 任务{}通过评审", index);
                }
                return TaskReport {
                    index,
                    description: task.description,
                    agent_role: role,
                    status: TaskStatus::Completed,
                    output,
                    revisions,
                };
            }
            Ok(review) => {
                revisions += 1;
                if revisions > revision_cap {
                    let e = CrewError::DelegationLoop {
                        task: task.description.clone(),
                        cap: revision_cap,
                    };
                    eprintln!("⚠️ {}", e);
                    return TaskReport {
                        index,
                        description: task.description,
                        agent_role: role,
                        status: TaskStatus::Failed,
                        output: e.to_string(),
                        revisions,
                    };
                }
                if verbose {
                    println!("🔁 任务{}进入第{}轮修订: {}", index, revisions, review.feedback);
                }
                feedback = Some(review.feedback);
            }
            // 评审本身的模型故障不应拖垮任务，视为通过
            Err(e) => {
                eprintln!("⚠️ 任务{}评审失败，产出按通过处理: {}", index, e);
                return TaskReport {
                    index,
                    description: task.description,
                    agent_role: role,
                    status: TaskStatus::Completed,
                    output,
                    revisions,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::binding::ModelBinding;
    use crate::llm::binding::testing::ScriptedBinding;

    const APPROVE: &str = r#"{"approved": true, "feedback": ""}"#;
    const REJECT: &str = r#"{"approved": false, "feedback": "请补充来源引用"}"#;

    fn worker(role: &str, binding: Arc<ScriptedBinding>) -> Agent {
        Agent::new(
            role,
            format!("{}的目标", role),
            format!("{}的背景", role),
            vec![],
            false,
            binding as Arc<dyn ModelBinding>,
        )
        .unwrap()
    }

    fn manager_agent(binding: Arc<ScriptedBinding>) -> Agent {
        Agent::new(
            "项目经理",
            "统筹任务并整合产出",
            "经验丰富的研究项目经理",
            vec![],
            true,
            binding as Arc<dyn ModelBinding>,
        )
        .unwrap()
    }

    fn config() -> CrewConfig {
        CrewConfig {
            max_actions_per_task: 6,
            revision_cap: 3,
        }
    }

    fn final_answer(text: &str) -> String {
        format!(r#"{{"action": "final_answer", "text": "{}"}}"#, text)
    }

    #[test]
    fn test_new_rejects_unknown_agent_in_task() {
        let binding = Arc::new(ScriptedBinding::new(vec![]));
        let result = Crew::new(
            vec![worker("研究员", binding)],
            None,
            vec![Task::new("检索论文", "论文清单", "不存在的角色")],
            ProcessMode::Sequential,
            config(),
        );
        assert!(matches!(result, Err(CrewError::UnknownAgent(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_roles() {
        let result = Crew::new(
            vec![
                worker("研究员", Arc::new(ScriptedBinding::new(vec![]))),
                worker("研究员", Arc::new(ScriptedBinding::new(vec![]))),
            ],
            None,
            vec![],
            ProcessMode::Sequential,
            config(),
        );
        assert!(matches!(result, Err(CrewError::DuplicateRole(_))));
    }

    #[test]
    fn test_hierarchical_requires_manager() {
        let binding = Arc::new(ScriptedBinding::new(vec![]));
        let result = Crew::new(
            vec![worker("研究员", binding)],
            None,
            vec![Task::new("检索论文", "论文清单", "研究员")],
            ProcessMode::Hierarchical,
            config(),
        );
        assert!(matches!(result, Err(CrewError::MissingManager)));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_run() {
        let binding = Arc::new(ScriptedBinding::new(vec![]));
        let mut crew = Crew::new(
            vec![worker("研究员", binding)],
            None,
            vec![Task::new("检索论文", "论文清单", "研究员")],
            ProcessMode::Sequential,
            config(),
        )
        .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let result = crew.kickoff(token).await;
        assert!(matches!(result, Err(CrewError::Cancelled)));

        // 取消发生在任务启动之前，任务仍停留在待执行状态
        assert_eq!(crew.task_statuses(), vec![TaskStatus::Pending]);
    }

    #[tokio::test]
    async fn test_task_statuses_advance_from_pending_to_terminal() {
        let first = Arc::new(ScriptedBinding::new(vec![&final_answer("找到论文")]));
        let second = Arc::new(ScriptedBinding::new(vec![]));

        let mut crew = Crew::new(
            vec![worker("检索员", first), worker("撰写员", second)],
            None,
            vec![
                Task::new("检索论文", "论文清单", "检索员"),
                Task::new("撰写综述", "综述文本", "撰写员"),
            ],
            ProcessMode::Sequential,
            CrewConfig {
                max_actions_per_task: 2,
                revision_cap: 3,
            },
        )
        .unwrap();

        assert!(crew.task_statuses().iter().all(|s| *s == TaskStatus::Pending));

        crew.kickoff(CancellationToken::new()).await.unwrap();
        assert_eq!(
            crew.task_statuses(),
            vec![TaskStatus::Completed, TaskStatus::Failed]
        );
    }

    #[tokio::test]
    async fn test_sequential_chains_context_in_order() {
        let first = Arc::new(ScriptedBinding::new(vec![&final_answer(
            "第一步找到了三篇论文",
        )]));
        let second = Arc::new(ScriptedBinding::new(vec![&final_answer(
            "基于三篇论文写出了综述",
        )]));

        let mut crew = Crew::new(
            vec![worker("检索员", first), worker("撰写员", second.clone())],
            None,
            vec![
                Task::new("检索论文", "论文清单", "检索员"),
                Task::new("撰写综述", "综述文本", "撰写员"),
            ],
            ProcessMode::Sequential,
            config(),
        )
        .unwrap();

        let output = crew.kickoff(CancellationToken::new()).await.unwrap();
        assert_eq!(output.status, RunStatus::Completed);
        assert_eq!(output.result, "基于三篇论文写出了综述");
        assert_eq!(output.reports.len(), 2);
        assert!(output.reports.iter().all(|r| r.status == TaskStatus::Completed));

        // 第二个任务的提示词里携带了第一个任务的产出
        let calls = second.calls.lock().unwrap();
        assert!(calls[0].1.contains("第一步找到了三篇论文"));
    }

    #[tokio::test]
    async fn test_sequential_mid_task_failure_does_not_fail_run() {
        // 第一个智能体的模型持续失败直到预算耗尽，失败说明流入下游上下文
        let first = Arc::new(ScriptedBinding::new(vec![]));
        let second = Arc::new(ScriptedBinding::new(vec![&final_answer(
            "基于检索失败的说明给出保守结论",
        )]));

        let mut crew = Crew::new(
            vec![worker("检索员", first), worker("撰写员", second)],
            None,
            vec![
                Task::new("检索论文", "论文清单", "检索员"),
                Task::new("撰写综述", "综述文本", "撰写员"),
            ],
            ProcessMode::Sequential,
            CrewConfig {
                max_actions_per_task: 2,
                revision_cap: 3,
            },
        )
        .unwrap();

        let output = crew.kickoff(CancellationToken::new()).await.unwrap();
        assert_eq!(output.status, RunStatus::Completed);
        assert_eq!(output.reports[0].status, TaskStatus::Failed);
        assert_eq!(output.reports[1].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_hierarchical_stages_and_consolidation() {
        let arxiv = Arc::new(ScriptedBinding::new(vec![&final_answer("arXiv: 三篇论文")]));
        let web = Arc::new(ScriptedBinding::new(vec![&final_answer("网络: 五条讨论")]));
        let verify = Arc::new(ScriptedBinding::new(vec![&final_answer(
            "核验: 来源一致",
        )]));
        let manager_binding = Arc::new(ScriptedBinding::new(vec![
            r#"{"assignments": [{"task": 0, "agent": "文献检索员"}], "rationale": "按专长指派"}"#,
            APPROVE,
            APPROVE,
            APPROVE,
            "最终研究报告",
        ]));

        let mut crew = Crew::new(
            vec![
                worker("文献检索员", arxiv),
                worker("网络检索员", web),
                worker("来源核验员", verify.clone()),
            ],
            Some(manager_agent(manager_binding)),
            vec![
                Task::new("检索arXiv论文", "论文清单", "文献检索员"),
                Task::new("检索网络讨论", "讨论摘要", "网络检索员"),
                Task::new("交叉核验来源", "核验结论", "来源核验员").depends_on(vec![0, 1]),
            ],
            ProcessMode::Hierarchical,
            config(),
        )
        .unwrap();

        let output = crew.kickoff(CancellationToken::new()).await.unwrap();
        assert_eq!(output.status, RunStatus::Completed);
        assert_eq!(output.result, "最终研究报告");
        assert!(output.reports.iter().all(|r| r.status == TaskStatus::Completed));

        // 核验任务的上下文里有两个前置任务的产出
        let calls = verify.calls.lock().unwrap();
        assert!(calls[0].1.contains("arXiv: 三篇论文"));
        assert!(calls[0].1.contains("网络: 五条讨论"));
    }

    #[tokio::test]
    async fn test_revision_cap_fails_task_and_marks_run_failed_with_result() {
        let worker_binding = Arc::new(ScriptedBinding::new(vec![
            &final_answer("初稿"),
            &final_answer("修订稿"),
        ]));
        let manager_binding = Arc::new(ScriptedBinding::new(vec![
            r#"{"assignments": [], "rationale": "保持预指派"}"#,
            REJECT,
            REJECT,
            "带失败说明的汇总",
        ]));

        let mut crew = Crew::new(
            vec![worker("撰写员", worker_binding.clone())],
            Some(manager_agent(manager_binding)),
            vec![Task::new("撰写综述", "综述文本", "撰写员")],
            ProcessMode::Hierarchical,
            CrewConfig {
                max_actions_per_task: 6,
                revision_cap: 1,
            },
        )
        .unwrap();

        let output = crew.kickoff(CancellationToken::new()).await.unwrap();
        assert_eq!(output.status, RunStatus::Failed);
        assert_eq!(output.result, "带失败说明的汇总");
        assert_eq!(output.reports[0].status, TaskStatus::Failed);
        assert!(output.reports[0].output.contains("管理者未能达成一致"));
        assert_eq!(output.reports[0].revisions, 2);

        // 修订轮次携带了管理者的修订意见
        let calls = worker_binding.calls.lock().unwrap();
        assert!(calls[1].1.contains("请补充来源引用"));
    }
}
