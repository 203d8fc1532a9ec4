//! LLM接入层 - 模型绑定、结构化提取与Provider客户端

pub mod binding;
pub mod client;
pub mod extract;

pub use binding::ModelBinding;
pub use client::LLMClient;
pub use extract::extract_structured;
