//! 组合应答智能体 - 在多个本地索引之间按问题选择并回答

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::llm::binding::ModelBinding;
use crate::llm::extract::extract_structured;
use crate::retrieval::index::RetrievalIndex;

/// 零索引可用时的固定应答
pub const NO_LOCAL_KNOWLEDGE: &str =
    "本地知识库当前不可用，无法基于本地文档回答该问题。请先构建并持久化文档索引。";

/// 模型做出的索引选择
#[derive(Debug, Deserialize, JsonSchema)]
struct IndexChoice {
    /// 被选中索引的名称
    index: String,
    /// 选择理由
    #[allow(dead_code)]
    reason: String,
}

/// 组合应答智能体
///
/// 它的全部工具就是已加载的检索索引；按问题主题与各索引的范围描述
/// 匹配来选择索引。选择本身由模型判断，选择失败时退回第一个索引。
pub struct AnsweringAgent {
    indexes: Vec<Arc<RetrievalIndex>>,
    binding: Arc<dyn ModelBinding>,
}

impl AnsweringAgent {
    pub fn new(indexes: Vec<Arc<RetrievalIndex>>, binding: Arc<dyn ModelBinding>) -> Self {
        Self { indexes, binding }
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// 回答问题。永远返回文本：零索引返回固定应答，内部失败渲染为说明文字。
    pub async fn ask(&self, question: &str) -> String {
        if self.indexes.is_empty() {
            return NO_LOCAL_KNOWLEDGE.to_string();
        }

        let index = if self.indexes.len() == 1 {
            self.indexes[0].clone()
        } else {
            self.select_index(question).await
        };

        match index.query(self.binding.as_ref(), question).await {
            Ok(answer) => {
                if answer.sources.is_empty() {
                    answer.text
                } else {
                    let sources = answer
                        .sources
                        .iter()
                        .map(|s| format!("- {}", s))
                        .collect::<Vec<_>>()
                        .join("\n");
                    format!("{}\n\n来源:\n{}", answer.text, sources)
                }
            }
            Err(e) => format!("本地文档问答失败: {}", e),
        }
    }

    /// 让模型根据各索引的范围描述选择最匹配的索引
    async fn select_index(&self, question: &str) -> Arc<RetrievalIndex> {
        let catalog = self
            .indexes
            .iter()
            .map(|idx| format!("- {}: {}", idx.name, idx.description))
            .collect::<Vec<_>>()
            .join("\n");

        let system_prompt =
            "你是一个本地文档问答路由器，负责为问题选择最匹配的知识索引。".to_string();
        let user_prompt = format!(
            "## 可用索引\n{}\n\n## 问题\n{}\n\n请选择与问题主题最匹配的索引。",
            catalog, question
        );

        let choice: Result<IndexChoice, _> =
            extract_structured(self.binding.as_ref(), &system_prompt, &user_prompt).await;

        match choice {
            Ok(choice) => self
                .indexes
                .iter()
                .find(|idx| idx.name == choice.index)
                .cloned()
                // 模型给出未知索引名时退回第一个索引
                .unwrap_or_else(|| self.indexes[0].clone()),
            Err(e) => {
                eprintln!("⚠️ 索引选择失败，退回默认索引: {}", e);
                self.indexes[0].clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::IndexSettings;
    use crate::llm::binding::testing::ScriptedBinding;

    fn build_index(name: &str, description: &str, text: &str) -> Arc<RetrievalIndex> {
        let temp_dir = TempDir::new().unwrap();
        let docstore = serde_json::json!({
            "docstore/data": {
                "node-1": {
                    "__data__": {
                        "text": text,
                        "metadata": { "file_name": format!("{}.pdf", name) }
                    }
                }
            }
        });
        std::fs::write(
            temp_dir.path().join("docstore.json"),
            docstore.to_string(),
        )
        .unwrap();

        let settings = IndexSettings {
            name: name.to_string(),
            dir: temp_dir.path().to_path_buf(),
            description: description.to_string(),
        };
        Arc::new(RetrievalIndex::load(&settings, 3).unwrap())
    }

    #[tokio::test]
    async fn test_ask_with_zero_indexes_returns_fixed_response() {
        let binding = Arc::new(ScriptedBinding::new(vec![]));
        let agent = AnsweringAgent::new(Vec::new(), binding.clone());

        let answer = agent.ask("What is attention?").await;
        assert_eq!(answer, NO_LOCAL_KNOWLEDGE);
        // 零索引时不应发生任何模型调用
        assert_eq!(binding.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ask_single_index_skips_selection() {
        let index = build_index("article_index", "论文内容问答", "Attention is all you need.");
        let binding = Arc::new(ScriptedBinding::new(vec!["注意力机制是核心。"]));
        let agent = AnsweringAgent::new(vec![index], binding.clone());

        let answer = agent.ask("attention 是什么").await;
        assert!(answer.contains("注意力机制是核心。"));
        assert!(answer.contains("article_index.pdf"));
        // 只有一次问答调用，没有选择调用
        assert_eq!(binding.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ask_selects_index_by_description() {
        let articles = build_index("article_index", "回答关于算法与AI论文的问题", "Paper text.");
        let books = build_index("book_index", "回答关于AI趋势书籍的问题", "Book text.");
        let binding = Arc::new(ScriptedBinding::new(vec![
            r#"{"index": "book_index", "reason": "问题与书籍内容相关"}"#,
            "书中提到AI趋势正在加速。",
        ]));
        let agent = AnsweringAgent::new(vec![articles, books], binding);

        let answer = agent.ask("书里怎么描述AI趋势").await;
        assert!(answer.contains("书中提到AI趋势正在加速。"));
        assert!(answer.contains("book_index.pdf"));
    }

    #[tokio::test]
    async fn test_unknown_index_choice_falls_back_to_first() {
        let articles = build_index("article_index", "论文问答", "Paper text.");
        let books = build_index("book_index", "书籍问答", "Book text.");
        let binding = Arc::new(ScriptedBinding::new(vec![
            r#"{"index": "no_such_index", "reason": "随便选的"}"#,
            "基于论文内容的回答。",
        ]));
        let agent = AnsweringAgent::new(vec![articles, books], binding);

        let answer = agent.ask("随便问问").await;
        assert!(answer.contains("基于论文内容的回答。"));
        assert!(answer.contains("article_index.pdf"));
    }
}
