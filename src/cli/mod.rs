use crate::config::{Config, LLMProvider};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PaperScout - 多智能体AI研究助手
#[derive(Parser, Debug)]
#[command(name = "paperscout")]
#[command(
    about = "Multi-agent AI research assistant. It orchestrates arXiv literature search, web search and cross-source verification into a final research report, and answers questions over locally persisted document indexes."
)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// PDF下载目录
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// LLM Provider (openai, deepseek, openrouter, anthropic, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// 高能效模型，优先用于常规推理任务
    #[arg(long, global = true)]
    pub model_efficient: Option<String>,

    /// 高质量模型，作为efficient失效情况下的兜底
    #[arg(long, global = true)]
    pub model_powerful: Option<String>,

    /// 最大tokens数
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// 最大并发调用数
    #[arg(long, global = true)]
    pub max_parallels: Option<usize>,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Command {
    /// 对一个主题执行完整的层级研究流程，输出最终研究报告
    Research {
        /// 研究主题
        topic: String,
    },
    /// 基于本地持久化文档索引回答问题
    Ask {
        /// 问题
        question: String,
    },
}

impl Args {
    /// 拆出子命令，并把CLI参数合并进配置
    pub fn into_parts(self) -> (Command, Config) {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path).unwrap_or_else(|e| {
                eprintln!(
                    "⚠️ 警告: 无法读取配置文件 {:?}（{}），使用默认配置",
                    config_path, e
                );
                Config::default()
            })
        } else {
            // 没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("paperscout.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|e| {
                    eprintln!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}（{}），使用默认配置",
                        default_config_path, e
                    );
                    Config::default()
                })
            } else {
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels;
        }

        // 其他配置
        if let Some(download_dir) = self.download_dir {
            config.download_dir = download_dir;
        }
        config.verbose = self.verbose;

        (self.command, config)
    }
}
