//! LLM客户端 - 提供带限流、超时与重试的统一模型调用入口

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::config::LLMConfig;
use crate::error::ModelCallError;
use crate::llm::binding::ModelBinding;

mod providers;

use providers::ProviderClient;

/// LLM客户端
///
/// 模型服务是被限流的外部资源：并发调用由信号量约束在 max_parallels 之内，
/// 每次调用带强制超时，失败时做有界重试，高能效模型多次失败后切换高质量模型兜底。
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
    limiter: Arc<Semaphore>,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(config)?;
        let limiter = Arc::new(Semaphore::new(config.max_parallels.max(1)));
        Ok(Self {
            client,
            limiter,
            config: config.clone(),
        })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        match self
            .complete_text("System: You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e.into())
            }
        }
    }

    /// 单次模型调用，带强制超时
    async fn complete_once(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelCallError> {
        let agent = self.client.create_agent(model, system_prompt, &self.config);
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        match tokio::time::timeout(timeout, agent.prompt(user_prompt)).await {
            Err(_) => Err(ModelCallError::Timeout(self.config.timeout_seconds)),
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ModelCallError::Completion(e.to_string())),
        }
    }

    /// 通用重试逻辑，带退避与抖动
    async fn complete_with_retry(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelCallError> {
        let max_retries = self.config.retry_attempts.max(1);
        let mut attempts = 0;

        loop {
            match self.complete_once(model, system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    attempts += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {} 次尝试): {}",
                        attempts, max_retries, err
                    );
                    if attempts >= max_retries {
                        return Err(err);
                    }
                    let jitter = rand::random::<u64>() % (self.config.retry_delay_ms / 2 + 1);
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms + jitter))
                        .await;
                }
            }
        }
    }

    /// 按提示词规模选择模型：超出高能效模型的适用范围时直接使用高质量模型
    fn evaluate_befitting_model(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> (String, Option<String>) {
        if system_prompt.len() + user_prompt.len() <= 32 * 1024 {
            return (
                self.config.model_efficient.clone(),
                Some(self.config.model_powerful.clone()),
            );
        }
        (self.config.model_powerful.clone(), None)
    }

    /// 统一的文本补全入口
    pub async fn complete_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelCallError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ModelCallError::Completion(e.to_string()))?;

        let (befitting_model, fallover_model) =
            self.evaluate_befitting_model(system_prompt, user_prompt);

        match self
            .complete_with_retry(&befitting_model, system_prompt, user_prompt)
            .await
        {
            Ok(text) => Ok(text),
            Err(err) => match fallover_model {
                Some(fallover) if fallover != befitting_model => {
                    eprintln!(
                        "❌ 高能效模型调用多次失败，切换高质量模型{}兜底...{}",
                        fallover, err
                    );
                    self.complete_with_retry(&fallover, system_prompt, user_prompt)
                        .await
                }
                _ => Err(err),
            },
        }
    }
}

#[async_trait]
impl ModelBinding for LLMClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelCallError> {
        self.complete_text(system_prompt, user_prompt).await
    }
}
