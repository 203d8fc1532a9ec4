use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// PDF下载目录
    pub download_dir: PathBuf,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 外部检索配置
    pub search: SearchConfig,

    /// 本地检索配置
    pub retrieval: RetrievalConfig,

    /// 编排配置
    pub crew: CrewConfig,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，优先用于常规推理任务
    pub model_efficient: String,

    /// 高质量模型，用于复杂推理任务，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,

    /// 最大并发调用数
    pub max_parallels: usize,
}

/// 外部检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// Tavily API KEY
    pub tavily_api_key: String,

    /// Tavily API基地址
    pub tavily_api_base_url: String,

    /// 网络检索返回的最大条数
    pub max_results: usize,

    /// 网络检索深度（basic / advanced）
    pub search_depth: String,

    /// arXiv查询API基地址
    pub arxiv_api_base_url: String,

    /// arXiv检索返回的最大条数
    pub arxiv_max_results: usize,
}

/// 单个本地索引的配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexSettings {
    /// 索引名称，同时是问答工具的名称
    pub name: String,

    /// 持久化目录
    pub dir: PathBuf,

    /// 该索引回答哪类问题的范围描述
    pub description: String,
}

/// 本地检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// 本地索引列表
    pub indexes: Vec<IndexSettings>,

    /// 每次检索取的文档块数
    pub top_k: usize,
}

/// 编排配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CrewConfig {
    /// 单个任务的动作预算
    pub max_actions_per_task: usize,

    /// 管理者修订轮数上限
    pub revision_cap: u32,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            verbose: false,
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            retrieval: RetrievalConfig::default(),
            crew: CrewConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("PAPERSCOUT_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.groq.com/openai/v1"),
            model_efficient: String::from("llama-3.1-8b-instant"),
            model_powerful: String::from("llama-3.3-70b-versatile"),
            max_tokens: 8192,
            temperature: 0.1,
            retry_attempts: 5,
            retry_delay_ms: 5000,
            timeout_seconds: 300,
            max_parallels: 3,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: std::env::var("TAVILY_API_KEY").unwrap_or_default(),
            tavily_api_base_url: String::from("https://api.tavily.com"),
            max_results: 3,
            search_depth: String::from("advanced"),
            arxiv_api_base_url: String::from("http://export.arxiv.org/api/query"),
            arxiv_max_results: 5,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            indexes: vec![
                IndexSettings {
                    name: String::from("article_index"),
                    dir: PathBuf::from("./article_data"),
                    description: String::from("回答关于算法、AI与深度学习论文内容的问题"),
                },
                IndexSettings {
                    name: String::from("book_index"),
                    dir: PathBuf::from("./book_data"),
                    description: String::from("回答关于AI趋势与行业洞察书籍内容的问题"),
                },
            ],
            top_k: 3,
        }
    }
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            max_actions_per_task: 6,
            revision_cap: 3,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
