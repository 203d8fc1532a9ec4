pub mod agent;
pub mod cli;
pub mod config;
pub mod crew;
pub mod error;
pub mod llm;
pub mod memory;
pub mod retrieval;
pub mod tools;
pub mod workflow;

// Re-export commonly used types
pub use config::Config;
pub use workflow::{AppContext, ask_local_documents, run_research};
