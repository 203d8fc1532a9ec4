//! 错误类型定义 - 各组件边界上的类型化错误

use std::path::PathBuf;
use thiserror::Error;

/// 模型调用错误
#[derive(Debug, Error)]
pub enum ModelCallError {
    /// 单次调用超过配置的超时时间
    #[error("模型调用超时（{0}秒）")]
    Timeout(u64),

    /// 模型服务返回错误（限流、鉴权失败、网络异常等）
    #[error("模型调用失败: {0}")]
    Completion(String),

    /// 模型输出无法解析为预期的结构化数据
    #[error("模型输出无法解析为预期结构: {0}")]
    MalformedCompletion(String),
}

/// 工具错误
#[derive(Debug, Error)]
pub enum ToolError {
    /// 注册表或智能体工具集中出现重名工具
    #[error("工具名称重复: {0}")]
    DuplicateToolName(String),

    /// 按名称调用时未找到对应工具
    #[error("未注册的工具: {0}")]
    UnknownTool(String),

    /// 工具底层能力执行失败（网络、鉴权、响应格式等）
    #[error("工具 {tool} 执行失败: {cause}")]
    Execution { tool: String, cause: String },
}

/// 检索索引加载错误 - 非致命，仅导致能力集缩减
#[derive(Debug, Error)]
pub enum IndexLoadError {
    #[error("索引目录不存在: {0}")]
    Missing(PathBuf),

    #[error("索引 {name} 数据损坏: {cause}")]
    Corrupt { name: String, cause: String },
}

/// 编排运行错误
#[derive(Debug, Error)]
pub enum CrewError {
    /// 任务指派的智能体不在编队名册中
    #[error("任务指派的智能体 {0} 不在编队名册中")]
    UnknownAgent(String),

    /// 编队名册中出现重复角色
    #[error("智能体角色重复: {0}")]
    DuplicateRole(String),

    /// 智能体工具集中出现重名工具
    #[error("智能体 {role} 的工具名称重复: {tool}")]
    DuplicateTool { role: String, tool: String },

    /// 层级模式缺少管理者智能体
    #[error("层级编排模式需要管理者智能体")]
    MissingManager,

    /// 管理者修订循环超过上限
    #[error("任务「{task}」的修订次数超过上限（{cap}次），管理者未能达成一致")]
    DelegationLoop { task: String, cap: u32 },

    /// 智能体耗尽动作预算仍未产出最终答案
    #[error("智能体 {role} 在动作预算内未能产出最终答案")]
    TaskFailure { role: String },

    /// 运行被协作式取消
    #[error("编排运行已被取消")]
    Cancelled,
}
