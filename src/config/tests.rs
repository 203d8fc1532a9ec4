#[cfg(test)]
mod tests {
    use crate::config::{Config, CrewConfig, LLMConfig, LLMProvider, RetrievalConfig, SearchConfig};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.download_dir, PathBuf::from("./downloads"));
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_provider_default() {
        let provider = LLMProvider::default();
        assert_eq!(provider, LLMProvider::OpenAI);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "deepseek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "openrouter".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenRouter
        );
        assert_eq!(
            "anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "ollama".parse::<LLMProvider>().unwrap(),
            LLMProvider::Ollama
        );

        assert!("invalid".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::OpenAI.to_string(), "openai");
        assert_eq!(LLMProvider::DeepSeek.to_string(), "deepseek");
        assert_eq!(LLMProvider::OpenRouter.to_string(), "openrouter");
        assert_eq!(LLMProvider::Anthropic.to_string(), "anthropic");
        assert_eq!(LLMProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();

        assert_eq!(config.provider, LLMProvider::OpenAI);
        // api_key may be empty if env var is not set
        assert!(!config.api_base_url.is_empty());
        assert!(!config.model_efficient.is_empty());
        assert!(!config.model_powerful.is_empty());
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_delay_ms, 5000);
        assert_eq!(config.timeout_seconds, 300);
        assert_eq!(config.max_parallels, 3);
    }

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();

        assert_eq!(config.tavily_api_base_url, "https://api.tavily.com");
        assert_eq!(config.max_results, 3);
        assert_eq!(config.search_depth, "advanced");
        assert_eq!(config.arxiv_api_base_url, "http://export.arxiv.org/api/query");
        assert_eq!(config.arxiv_max_results, 5);
    }

    #[test]
    fn test_retrieval_config_default() {
        let config = RetrievalConfig::default();

        assert_eq!(config.indexes.len(), 2);
        assert_eq!(config.indexes[0].name, "article_index");
        assert_eq!(config.indexes[0].dir, PathBuf::from("./article_data"));
        assert_eq!(config.indexes[1].name, "book_index");
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_crew_config_default() {
        let config = CrewConfig::default();

        assert_eq!(config.max_actions_per_task, 6);
        assert_eq!(config.revision_cap, 3);
    }

    #[test]
    fn test_from_file_with_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("paperscout.toml");
        std::fs::write(
            &config_path,
            r#"
verbose = true

[llm]
provider = "deepseek"
model_efficient = "deepseek-chat"

[crew]
revision_cap = 5
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert!(config.verbose);
        assert_eq!(config.llm.provider, LLMProvider::DeepSeek);
        assert_eq!(config.llm.model_efficient, "deepseek-chat");
        // 未出现在文件中的字段保持默认值
        assert_eq!(config.crew.revision_cap, 5);
        assert_eq!(config.crew.max_actions_per_task, 6);
        assert_eq!(config.retrieval.indexes.len(), 2);
    }

    #[test]
    fn test_from_file_missing_file() {
        let result = Config::from_file(&PathBuf::from("/nonexistent/paperscout.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("paperscout.toml");
        std::fs::write(&config_path, "not = [valid").unwrap();

        let result = Config::from_file(&config_path);
        assert!(result.is_err());
    }
}
