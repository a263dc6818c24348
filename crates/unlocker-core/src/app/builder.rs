//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - ステージ表が呼び出しうる capability を build() 時に列挙
//! - 「必要な capability ⊆ 登録済み resolver」をチェック
//! - 不足があれば BuildError を返す（実行時に初めて気づくことはない）

use std::sync::Arc;

use crate::config::Settings;
use crate::domain::{RunId, TaskId};
use crate::ports::{Clock, IdGenerator, Resolver, SystemClock, TaskStore, UlidGenerator};
use crate::resolver::{
    Capability, DomainSet, RegistryError, ResolverChain, ResolverRegistry, StageTable,
};

use super::context::RunContext;
use super::direct::DirectExecutor;
use super::overlay::ResultOverlay;
use super::persistence::PersistenceAdapter;
use super::sequential::SequentialExecutor;
use super::supervisor::RetrySupervisor;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(settings)
///     .register(Capability::CLOUD, Arc::new(cloud))?
///     .with_store(Arc::new(store))
///     .build()?;
/// ```
pub struct AppBuilder {
    settings: Settings,
    registry: ResolverRegistry,
    table: Option<StageTable>,
    store: Option<Arc<dyn TaskStore>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing resolvers for capabilities: {0:?}. The stage table uses them but nothing was registered.")]
    MissingResolvers(Vec<String>),

    #[error("No task store configured")]
    MissingStore,
}

impl AppBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            registry: ResolverRegistry::new(),
            table: None,
            store: None,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub fn register(
        mut self,
        capability: impl Into<Capability>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, RegistryError> {
        self.registry.register(capability, resolver)?;
        Ok(self)
    }

    pub fn with_registry(mut self, registry: ResolverRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the stage table built from settings.
    pub fn with_stage_table(mut self, table: StageTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let table = self
            .table
            .unwrap_or_else(|| StageTable::from_settings(&self.settings));
        let missing: Vec<String> = table
            .capabilities()
            .into_iter()
            .filter(|c| !self.registry.contains(c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingResolvers(missing));
        }
        let store = self.store.ok_or(BuildError::MissingStore)?;

        let pipeline = &self.settings.pipeline;
        let chain = Arc::new(ResolverChain::new(table, Arc::new(self.registry)));
        let persistence = Arc::new(PersistenceAdapter::new(store.clone(), self.clock.clone()));
        let supervisor = Arc::new(RetrySupervisor::new(
            chain,
            persistence,
            self.ids.clone(),
            pipeline.link_timeout(),
            pipeline.max_attempts,
        ));

        Ok(App {
            store,
            clock: self.clock,
            ids: self.ids,
            bypass: DomainSet::from(self.settings.routing.bypass_domains.as_slice()),
            direct: DirectExecutor::new(supervisor.clone()),
            sequential: SequentialExecutor::new(supervisor, pipeline.time_budget()),
            overlay: Arc::new(ResultOverlay::new(pipeline.overlay_grace())),
        })
    }
}

/// App は両エントリポイント（バッチ / ストリーム）を提供
pub struct App {
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    pub(crate) bypass: DomainSet,
    pub(crate) direct: DirectExecutor,
    pub(crate) sequential: SequentialExecutor,
    pub(crate) overlay: Arc<ResultOverlay>,
}

impl App {
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn overlay(&self) -> &Arc<ResultOverlay> {
        &self.overlay
    }

    /// Fresh context; the budget clock starts now.
    pub(crate) fn context(&self, task_id: Option<TaskId>, extracted_by: Option<String>) -> RunContext {
        let run_id: RunId = self.ids.generate_run_id();
        RunContext::new(run_id, task_id, extracted_by)
    }
}
