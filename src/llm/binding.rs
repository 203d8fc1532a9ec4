//! 模型绑定 - 所有模型驱动的推理与选择都经由这一个接口

use async_trait::async_trait;

use crate::error::ModelCallError;

/// 统一的模型能力接口：输入系统提示词与用户提示词，返回一段文本补全。
///
/// 智能体、管理者与检索应答都只依赖这个接口，测试中用脚本化实现替换。
#[async_trait]
pub trait ModelBinding: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelCallError>;
}
