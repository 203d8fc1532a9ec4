//! 检索索引 - 加载持久化的文档库并支持按问题检索回答

use std::path::Path;

use serde_json::Value;

use crate::config::IndexSettings;
use crate::error::{IndexLoadError, ModelCallError};
use crate::llm::binding::ModelBinding;

/// 索引中的一个文档块
#[derive(Debug, Clone)]
pub struct DocChunk {
    pub id: String,
    pub text: String,
    pub source: String,
}

/// 一次索引问答的结果
#[derive(Debug, Clone)]
pub struct IndexAnswer {
    pub text: String,
    pub sources: Vec<String>,
}

/// 已加载的检索索引
///
/// 向量构建与持久化格式不在本系统职责内，这里只读取持久化目录中的
/// docstore.json（llama-index持久化布局），检索采用确定性的词项重合打分。
pub struct RetrievalIndex {
    pub name: String,
    pub description: String,
    chunks: Vec<DocChunk>,
    top_k: usize,
}

impl RetrievalIndex {
    /// 从持久化目录加载索引；目录缺失或数据损坏都是类型化的加载错误
    pub fn load(settings: &IndexSettings, top_k: usize) -> Result<Self, IndexLoadError> {
        if !settings.dir.exists() {
            return Err(IndexLoadError::Missing(settings.dir.clone()));
        }

        let chunks = Self::read_docstore(&settings.dir, &settings.name)?;
        Ok(Self {
            name: settings.name.clone(),
            description: settings.description.clone(),
            chunks,
            top_k: top_k.max(1),
        })
    }

    fn read_docstore(dir: &Path, name: &str) -> Result<Vec<DocChunk>, IndexLoadError> {
        let corrupt = |cause: String| IndexLoadError::Corrupt {
            name: name.to_string(),
            cause,
        };

        let docstore_path = dir.join("docstore.json");
        let content = std::fs::read_to_string(&docstore_path)
            .map_err(|e| corrupt(format!("无法读取 {}: {}", docstore_path.display(), e)))?;
        let payload: Value =
            serde_json::from_str(&content).map_err(|e| corrupt(format!("JSON解析失败: {}", e)))?;

        let data = payload
            .get("docstore/data")
            .and_then(|v| v.as_object())
            .ok_or_else(|| corrupt("缺少 docstore/data 字段".to_string()))?;

        let mut chunks = Vec::new();
        for (id, node) in data {
            let node_data = node.get("__data__").unwrap_or(node);
            let text = node_data
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if text.trim().is_empty() {
                continue;
            }

            let source = node_data
                .get("metadata")
                .and_then(|m| m.get("file_name"))
                .and_then(|v| v.as_str())
                .unwrap_or(id)
                .to_string();

            chunks.push(DocChunk {
                id: id.clone(),
                text: text.to_string(),
                source,
            });
        }

        // 按id排序，保证块顺序与遍历顺序无关
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(chunks)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// 词项重合打分，取top-k文档块。确定性：同样的问题总是命中同样的块。
    fn top_chunks(&self, question: &str) -> Vec<&DocChunk> {
        let mut terms: Vec<String> = question
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 3)
            .map(String::from)
            .collect();
        // 去重：每个词项只计一票，问题里重复的词不抬高得分
        terms.sort();
        terms.dedup();

        let mut scored: Vec<(usize, &DocChunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let haystack = chunk.text.to_lowercase();
                let score = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score, chunk)
            })
            .collect();

        // 稳定排序，得分相同时保持块的原始顺序
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, chunk)| chunk)
            .collect()
    }

    /// 基于检索到的文档块，让模型严格依据摘录回答问题
    pub async fn query(
        &self,
        binding: &dyn ModelBinding,
        question: &str,
    ) -> Result<IndexAnswer, ModelCallError> {
        if self.chunks.is_empty() {
            return Ok(IndexAnswer {
                text: format!("索引 {} 中没有可用文档。", self.name),
                sources: Vec::new(),
            });
        }

        let selected = self.top_chunks(question);
        let mut sources: Vec<String> = Vec::new();
        let mut excerpts = String::new();
        for chunk in &selected {
            excerpts.push_str(&format!("[来源: {}]\n{}\n\n", chunk.source, chunk.text));
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }

        let system_prompt = format!(
            "你是一个严谨的文档问答助手，负责回答关于「{}」的问题。\n只依据给定的文档摘录回答；摘录中没有的信息要明确说明无法回答，不得编造。",
            self.description
        );
        let user_prompt = format!(
            "## 文档摘录\n{}## 问题\n{}\n\n请仅依据上述摘录回答问题。",
            excerpts, question
        );

        let text = binding.complete(&system_prompt, &user_prompt).await?;
        Ok(IndexAnswer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::llm::binding::testing::ScriptedBinding;

    fn write_docstore(dir: &Path) {
        let docstore = serde_json::json!({
            "docstore/data": {
                "node-1": {
                    "__data__": {
                        "text": "Attention mechanisms allow models to focus on relevant tokens.",
                        "metadata": { "file_name": "attention_paper.pdf" }
                    }
                },
                "node-2": {
                    "__data__": {
                        "text": "Convolutional networks excel at image recognition tasks.",
                        "metadata": { "file_name": "cnn_survey.pdf" }
                    }
                }
            }
        });
        std::fs::write(
            dir.join("docstore.json"),
            serde_json::to_string_pretty(&docstore).unwrap(),
        )
        .unwrap();
    }

    fn settings(dir: PathBuf) -> IndexSettings {
        IndexSettings {
            name: "article_index".to_string(),
            dir,
            description: "本地论文内容".to_string(),
        }
    }

    #[test]
    fn test_load_missing_dir() {
        let result = RetrievalIndex::load(&settings(PathBuf::from("/nonexistent/index")), 3);
        assert!(matches!(result, Err(IndexLoadError::Missing(_))));
    }

    #[test]
    fn test_load_corrupt_docstore() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("docstore.json"), "not json").unwrap();

        let result = RetrievalIndex::load(&settings(temp_dir.path().to_path_buf()), 3);
        assert!(matches!(result, Err(IndexLoadError::Corrupt { .. })));
    }

    #[test]
    fn test_load_and_rank_chunks() {
        let temp_dir = TempDir::new().unwrap();
        write_docstore(temp_dir.path());

        let index = RetrievalIndex::load(&settings(temp_dir.path().to_path_buf()), 1).unwrap();
        assert_eq!(index.chunk_count(), 2);

        let top = index.top_chunks("how do attention mechanisms work");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].source, "attention_paper.pdf");
    }

    #[test]
    fn test_repeated_query_terms_count_once() {
        let temp_dir = TempDir::new().unwrap();
        write_docstore(temp_dir.path());

        let index = RetrievalIndex::load(&settings(temp_dir.path().to_path_buf()), 1).unwrap();

        // "attention"重复三次只算一票，命中两个词项的块应当胜出
        let top = index.top_chunks("attention attention attention image recognition");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].source, "cnn_survey.pdf");
    }

    #[tokio::test]
    async fn test_query_returns_answer_with_sources() {
        let temp_dir = TempDir::new().unwrap();
        write_docstore(temp_dir.path());

        let index = RetrievalIndex::load(&settings(temp_dir.path().to_path_buf()), 1).unwrap();
        let binding = ScriptedBinding::new(vec!["注意力机制让模型聚焦于相关的token。"]);

        let answer = index
            .query(&binding, "how do attention mechanisms work")
            .await
            .unwrap();
        assert!(answer.text.contains("注意力"));
        assert_eq!(answer.sources, vec!["attention_paper.pdf".to_string()]);
    }
}
