//! 工作流 - 面向前端适配层的两个入口
//!
//! run_research 与 ask_local_documents 是系统对外的全部能力面。
//! 两者都只返回文本：内部的构造失败、任务失败与取消都被渲染为
//! 可读的说明文字，绝不向适配层抛出异常。

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio_util::sync::CancellationToken;

use crate::agent::Agent;
use crate::config::Config;
use crate::crew::{Crew, ProcessMode, RunStatus, Task};
use crate::llm::binding::ModelBinding;
use crate::llm::client::LLMClient;
use crate::retrieval::RetrievalEngine;
use crate::tools::{
    AgentToolArxivSearch, AgentToolEngagement, AgentToolPdfDownload, AgentToolWebSearch,
    ToolRegistry,
};

/// 应用上下文 - 配置与共享的模型客户端
pub struct AppContext {
    pub config: Config,
    llm: Arc<LLMClient>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let llm = Arc::new(LLMClient::new(&config.llm)?);
        Ok(Self { config, llm })
    }

    pub fn binding(&self) -> Arc<dyn ModelBinding> {
        self.llm.clone()
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        self.llm.check_connection().await
    }
}

/// 注册全部预置工具
fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(AgentToolArxivSearch::new(config.search.clone())))?;
    registry.register(Arc::new(AgentToolWebSearch::new(config.search.clone())))?;
    registry.register(Arc::new(AgentToolPdfDownload::new(
        config.download_dir.clone(),
    )))?;
    registry.register(Arc::new(AgentToolEngagement::new()))?;
    Ok(registry)
}

/// 组建研究编队：三名执行智能体、一名管理者和三项层级任务
///
/// 来源核验员额外携带已加载的本地索引问答工具，核验时可对照本地文献。
fn build_research_crew(ctx: &AppContext, topic: &str) -> Result<Crew> {
    let registry = build_registry(&ctx.config)?;
    let engine = RetrievalEngine::load_all(&ctx.config.retrieval);
    let tool = |name: &str| {
        registry
            .get(name)
            .ok_or_else(|| anyhow!("预置工具缺失: {}", name))
    };

    let binding = ctx.binding();
    let verbose = ctx.config.verbose;

    let literature = Agent::new(
        "文献检索员",
        "在arXiv上检索与主题相关的高质量论文并整理要点",
        "熟悉学术检索与论文筛选的研究助理，擅长快速定位关键文献。",
        vec![tool("search_arxiv_papers")?, tool("download_arxiv_pdf")?],
        false,
        binding.clone(),
    )?
    .with_verbose(verbose);

    let web = Agent::new(
        "网络检索员",
        "检索网络上的最新讨论、新闻与观点并评估其传播度",
        "资深的网络情报分析师，擅长从嘈杂的信息流中提炼可靠信号。",
        vec![tool("search_web")?, tool("calculate_engagement")?],
        false,
        binding.clone(),
    )?
    .with_verbose(verbose);

    let verifier = Agent::new(
        "来源核验员",
        "交叉比对学术、网络与本地文献来源，指出一致结论与分歧",
        "严谨的事实核查员，只认可有出处的结论。",
        engine.query_tools(binding.clone()),
        false,
        binding.clone(),
    )?
    .with_verbose(verbose);

    let manager = Agent::new(
        "研究项目经理",
        "统筹研究任务的指派、评审与整合，产出最终研究报告",
        "带领跨领域团队多年的研究项目经理，对产出质量负全责。",
        vec![],
        true,
        binding,
    )?
    .with_verbose(verbose);

    let tasks = vec![
        Task::new(
            format!("在arXiv上检索关于「{}」的论文，整理每篇的标题、链接与摘要要点。", topic),
            "一份带链接的论文清单及要点摘要",
            "文献检索员",
        ),
        Task::new(
            format!("在网络上检索关于「{}」的最新讨论、新闻与观点，注明每条信息的来源。", topic),
            "一份带来源链接的网络信息摘要",
            "网络检索员",
        ),
        Task::new(
            "交叉核验前两项检索结果，指出学术来源与网络来源之间的一致结论与分歧，并给出综合判断。",
            "一份指出一致与分歧的核验结论",
            "来源核验员",
        )
        .depends_on(vec![0, 1]),
    ];

    let crew = Crew::new(
        vec![literature, web, verifier],
        Some(manager),
        tasks,
        ProcessMode::Hierarchical,
        ctx.config.crew.clone(),
    )?
    .with_verbose(verbose);
    Ok(crew)
}

/// 对一个主题执行完整的层级研究流程，返回最终研究报告文本
pub async fn run_research(ctx: &AppContext, topic: &str, cancel: CancellationToken) -> String {
    let mut crew = match build_research_crew(ctx, topic) {
        Ok(crew) => crew,
        Err(e) => return format!("无法完成研究任务: {}", e),
    };

    match crew.kickoff(cancel).await {
        Ok(output) => {
            if output.status == RunStatus::Failed {
                eprintln!("⚠️ 研究运行部分失败，结果中可能包含失败说明");
            }
            output.result
        }
        Err(e) => format!("无法完成研究任务: {}", e),
    }
}

/// 基于本地持久化索引回答问题，索引不可用时返回固定应答
pub async fn ask_local_documents(ctx: &AppContext, question: &str) -> String {
    let engine = RetrievalEngine::load_all(&ctx.config.retrieval);
    engine.compose(ctx.binding()).ask(question).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registry_has_all_preset_tools() {
        let registry = build_registry(&Config::default()).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("search_arxiv_papers").is_some());
        assert!(registry.get("search_web").is_some());
        assert!(registry.get("download_arxiv_pdf").is_some());
        assert!(registry.get("calculate_engagement").is_some());
    }

    #[test]
    fn test_build_research_crew_with_default_config() {
        let ctx = AppContext::new(Config::default()).unwrap();
        assert!(build_research_crew(&ctx, "大语言模型").is_ok());
    }

    #[test]
    fn test_build_research_crew_threads_verbose_setting() {
        let config = Config {
            verbose: true,
            ..Config::default()
        };
        let ctx = AppContext::new(config).unwrap();

        let crew = build_research_crew(&ctx, "大语言模型").unwrap();
        assert!(crew.is_verbose());

        let quiet_ctx = AppContext::new(Config::default()).unwrap();
        let quiet = build_research_crew(&quiet_ctx, "大语言模型").unwrap();
        assert!(!quiet.is_verbose());
    }
}
