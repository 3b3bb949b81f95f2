//! Web search provider clients.

pub mod tavily;

pub use tavily::TavilyClient;
