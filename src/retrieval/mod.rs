//! 检索引擎 - 加载持久化索引并组合为单一问答面
//!
//! 索引加载是尽力而为：任何一个索引加载失败只会记录警告并缩减能力集，
//! 绝不会让进程启动失败。零索引时组合出的应答智能体返回固定应答。

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::llm::binding::ModelBinding;
use crate::tools::AgentTool;

pub mod answering;
pub mod index;
pub mod query_tool;

pub use answering::{AnsweringAgent, NO_LOCAL_KNOWLEDGE};
pub use index::RetrievalIndex;
pub use query_tool::QueryEngineTool;

/// 检索引擎
pub struct RetrievalEngine {
    indexes: Vec<Arc<RetrievalIndex>>,
}

impl RetrievalEngine {
    /// 加载配置中的全部索引，失败的索引被跳过并记录警告
    pub fn load_all(config: &RetrievalConfig) -> Self {
        let mut indexes = Vec::new();

        for settings in &config.indexes {
            match RetrievalIndex::load(settings, config.top_k) {
                Ok(index) => {
                    println!(
                        "📚 已加载本地索引 {}（{} 个文档块）",
                        index.name,
                        index.chunk_count()
                    );
                    indexes.push(Arc::new(index));
                }
                Err(e) => {
                    eprintln!("⚠️ 本地索引 {} 加载失败，系统将在缺少该索引的情况下继续: {}", settings.name, e);
                }
            }
        }

        Self { indexes }
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// 把每个已加载的索引包装为可被智能体选择的问答工具
    pub fn query_tools(&self, binding: Arc<dyn ModelBinding>) -> Vec<Arc<dyn AgentTool>> {
        self.indexes
            .iter()
            .map(|index| {
                Arc::new(QueryEngineTool::new(index.clone(), binding.clone()))
                    as Arc<dyn AgentTool>
            })
            .collect()
    }

    /// 组合为单一应答智能体
    pub fn compose(&self, binding: Arc<dyn ModelBinding>) -> AnsweringAgent {
        AnsweringAgent::new(self.indexes.clone(), binding)
    }
}
