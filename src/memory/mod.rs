//! 运行内存 - 单次编排运行内的作用域化数据存储
//!
//! 任务产出、管理者计划等中间结果按 scope:key 存放，随运行结束丢弃。

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 内存元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub access_counts: HashMap<String, u64>,
}

impl Default for MemoryMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMetadata {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            last_updated: Utc::now(),
            access_counts: HashMap::new(),
        }
    }
}

/// 运行内存
#[derive(Debug)]
pub struct Memory {
    data: HashMap<String, Value>,
    metadata: MemoryMetadata,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            metadata: MemoryMetadata::new(),
        }
    }

    /// 存储数据到指定作用域和键
    pub fn store<T>(&mut self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        let full_key = format!("{}:{}", scope, key);
        let serialized = serde_json::to_value(data)?;

        self.metadata.last_updated = Utc::now();
        self.data.insert(full_key, serialized);
        Ok(())
    }

    /// 从指定作用域和键获取数据
    pub fn get<T>(&mut self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        let full_key = format!("{}:{}", scope, key);

        *self
            .metadata
            .access_counts
            .entry(full_key.clone())
            .or_insert(0) += 1;

        self.data
            .get(&full_key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// 列出指定作用域的所有键
    pub fn list_keys(&self, scope: &str) -> Vec<String> {
        let prefix = format!("{}:", scope);
        self.data
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .map(|key| key[prefix.len()..].to_string())
            .collect()
    }

    /// 检查是否存在指定数据
    pub fn has_data(&self, scope: &str, key: &str) -> bool {
        let full_key = format!("{}:{}", scope, key);
        self.data.contains_key(&full_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get_scoped_data() {
        let mut memory = Memory::new();
        memory
            .store("task_outputs", "0", "arXiv检索结果".to_string())
            .unwrap();

        let output: Option<String> = memory.get("task_outputs", "0");
        assert_eq!(output.as_deref(), Some("arXiv检索结果"));
        assert!(memory.has_data("task_outputs", "0"));
        assert!(!memory.has_data("manager", "plan"));
    }

    #[test]
    fn test_list_keys_filters_by_scope() {
        let mut memory = Memory::new();
        memory.store("task_outputs", "0", "a").unwrap();
        memory.store("task_outputs", "1", "b").unwrap();
        memory.store("manager", "plan", "c").unwrap();

        let mut keys = memory.list_keys("task_outputs");
        keys.sort();
        assert_eq!(keys, vec!["0", "1"]);
    }
}
