//! Application state: database, stores, and the workflow engine.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use scout_core::embed::{BoxEmbedder, BoxVectorSink};
use scout_core::pipeline::{PlanDeps, ResearchDeps};
use scout_core::search::BoxSearchProvider;
use scout_core::workflow::WorkflowEngine;
use scout_infra::embed::MixedbreadEmbedder;
use scout_infra::llm::GroqConnector;
use scout_infra::search::TavilyClient;
use scout_infra::sqlite::{pool::default_database_url, DatabasePool, SqliteJobStore, SqliteWorkflowState};
use scout_infra::store::{JsonFileJobStore, ReplicatedJobStore};
use scout_infra::vector::PineconeSink;
use scout_types::config::ScoutConfig;

/// The concrete job store: SQLite primary with a best-effort JSON-file
/// secondary archive.
pub type Store = ReplicatedJobStore<SqliteJobStore, JsonFileJobStore>;

/// The concrete engine wiring used by the application.
pub type Engine = WorkflowEngine<Store, SqliteWorkflowState>;

/// Shared application state for HTTP handlers and CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<ScoutConfig>,
}

impl AppState {
    /// Initialize database, stores, and the workflow engine.
    pub async fn init(database_url: Option<String>) -> anyhow::Result<Self> {
        let data_dir = scout_types::config::data_dir();
        std::fs::create_dir_all(&data_dir)?;

        let config = ScoutConfig::load(&data_dir.join("config.toml"))?;

        let url = database_url.unwrap_or_else(default_database_url);
        let pool = DatabasePool::new(&url).await?;

        let primary = SqliteJobStore::new(pool.clone());
        let secondary = JsonFileJobStore::new(data_dir.join("jobs"))?;
        let store = Arc::new(ReplicatedJobStore::new(primary, secondary));
        let workflow_state = Arc::new(SqliteWorkflowState::new(pool));

        let engine = Arc::new(WorkflowEngine::new(store, workflow_state));

        Ok(Self {
            engine,
            config: Arc::new(config),
        })
    }

    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.config.selection_timeout_secs)
    }

    /// Research collaborators built from request-scoped API keys.
    pub fn research_deps(&self, llm_key: SecretString, search_key: SecretString) -> ResearchDeps {
        ResearchDeps {
            llm: Arc::new(GroqConnector::new(llm_key)),
            search: Arc::new(BoxSearchProvider::new(TavilyClient::new(search_key))),
        }
    }

    /// Plan collaborators built from request-scoped API keys.
    ///
    /// The embedding/vector clients are only exercised by vector_embed plan
    /// steps; handlers validate key presence when the plan contains one.
    pub fn plan_deps(
        &self,
        llm_key: SecretString,
        search_key: SecretString,
        embedding_key: SecretString,
        vector_key: SecretString,
        vector_host: String,
    ) -> PlanDeps {
        PlanDeps {
            research: self.research_deps(llm_key, search_key),
            embedder: Arc::new(BoxEmbedder::new(MixedbreadEmbedder::new(embedding_key))),
            vectors: Arc::new(BoxVectorSink::new(PineconeSink::new(vector_key, vector_host))),
            model: self.config.default_model.clone(),
            fallback_model: Some(self.config.default_fallback_model.clone()),
            vector_index: self.config.default_vector_index.clone(),
        }
    }

    /// Plan collaborators from server-side configured keys, used to resume
    /// interrupted jobs after a restart. `None` when no keys are configured.
    pub fn server_plan_deps(&self) -> Option<PlanDeps> {
        let providers = &self.config.providers;
        let llm = providers.llm_api_key.clone()?;
        let search = providers.search_api_key.clone()?;
        let embedding = providers.embedding_api_key.clone().unwrap_or_default();
        let vector = providers.vector_api_key.clone().unwrap_or_default();
        let host = providers.vector_host.clone().unwrap_or_default();

        Some(self.plan_deps(
            SecretString::from(llm),
            SecretString::from(search),
            SecretString::from(embedding),
            SecretString::from(vector),
            host,
        ))
    }
}
