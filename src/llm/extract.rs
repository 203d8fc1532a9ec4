//! 结构化提取 - 将模型输出约束为符合JSON Schema的结构化数据

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::ModelCallError;
use crate::llm::binding::ModelBinding;

/// 通过模型绑定提取结构化数据。
///
/// 在用户提示词后附加目标类型的JSON Schema；若首次输出解析失败，
/// 把解析错误反馈给模型做一次修复重试，仍失败则报 MalformedCompletion。
pub async fn extract_structured<T>(
    binding: &dyn ModelBinding,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<T, ModelCallError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = schemars::schema_for!(T);
    let schema_text = serde_json::to_string_pretty(&schema)
        .map_err(|e| ModelCallError::MalformedCompletion(e.to_string()))?;
    let instructed = format!(
        "{}\n\n## 输出格式要求\n只输出一个符合以下JSON Schema的JSON对象，不要附加任何解释文字：\n{}",
        user_prompt, schema_text
    );

    let raw = binding.complete(system_prompt, &instructed).await?;
    match parse_json_payload::<T>(&raw) {
        Ok(value) => Ok(value),
        Err(parse_err) => {
            let repair_prompt = format!(
                "{}\n\n**注意事项**上一次输出无法解析（错误：{}），请严格按照Schema重新输出JSON",
                instructed, parse_err
            );
            let raw = binding.complete(system_prompt, &repair_prompt).await?;
            parse_json_payload::<T>(&raw).map_err(|e| {
                ModelCallError::MalformedCompletion(format!(
                    "{}（原始输出片段：{}）",
                    e,
                    truncate_chars(&raw, 200)
                ))
            })
        }
    }
}

/// 从模型输出中剥离代码围栏等噪声后解析JSON
fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    // 模型经常把JSON包在围栏或说明文字中，截取首个'{'到最后一个'}'之间的内容
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
    {
        return serde_json::from_str::<T>(&trimmed[start..=end]).map_err(|e| e.to_string());
    }

    Err("输出中未找到JSON对象".to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
