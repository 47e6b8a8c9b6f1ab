//! The orchestration session.
//!
//! One [`Session`] owns everything a run mutates: the Reference Kit, the
//! Placement Set, the Working Source and the first-run flag. Stages borrow
//! it mutably, one at a time.

use chrono::Utc;
use kitsmith_config::AppConfig;
use kitsmith_core::{
    EventBus, Position, RunEvent, SequenceState, Stage, StageError, StageReport, Status, World,
};
use kitsmith_index::{FirstMatch, IndexStore, SourceSelector, selector_by_name};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::actuator::Actuator;
use crate::kit::ReferenceKit;
use crate::placement_set::PlacementSet;
use crate::retry::RetryPolicies;
use crate::stages;

/// Live view of what the session is doing, readable while it is busy.
#[derive(Debug, Clone, Serialize)]
pub struct RunProgress {
    pub state: SequenceState,
    pub stage: Option<Stage>,
    pub run_id: Option<String>,
    pub current_item: Option<String>,
    pub last_message: Option<String>,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self {
            state: SequenceState::Idle,
            stage: None,
            run_id: None,
            current_item: None,
            last_message: None,
        }
    }
}

pub struct Session {
    pub(crate) world: Arc<dyn World>,
    pub(crate) store: Arc<dyn IndexStore>,
    pub(crate) config: AppConfig,
    pub(crate) policies: RetryPolicies,
    pub(crate) selector: Box<dyn SourceSelector>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) cancel: CancellationToken,
    pub(crate) kit: ReferenceKit,
    pub(crate) placement: PlacementSet,
    pub(crate) working_source: Option<Position>,
    pub(crate) first_run: bool,
    pub(crate) progress: Arc<RwLock<RunProgress>>,
}

impl Session {
    pub fn new(world: Arc<dyn World>, store: Arc<dyn IndexStore>, config: AppConfig) -> Self {
        let selector: Box<dyn SourceSelector> = match selector_by_name(&config.index.selector) {
            Some(selector) => selector,
            None => {
                warn!(selector = %config.index.selector, "Unknown source selector, using first_match");
                Box::new(FirstMatch)
            }
        };
        let policies = RetryPolicies::from(&config.retry);

        Self {
            world,
            store,
            config,
            policies,
            selector,
            events: Arc::new(EventBus::default()),
            cancel: CancellationToken::new(),
            kit: ReferenceKit::default(),
            placement: PlacementSet::new(),
            working_source: None,
            first_run: true,
            progress: Arc::new(RwLock::new(RunProgress::default())),
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_selector(mut self, selector: Box<dyn SourceSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_kit(mut self, kit: ReferenceKit) -> Self {
        self.kit = kit;
        self
    }

    /// Token checked at every suspension point of subsequent stages.
    pub fn set_cancel_token(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn world(&self) -> &Arc<dyn World> {
        &self.world
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn progress(&self) -> &Arc<RwLock<RunProgress>> {
        &self.progress
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn kit(&self) -> &ReferenceKit {
        &self.kit
    }

    /// Replace the Reference Kit wholesale.
    pub fn set_kit(&mut self, items: Vec<String>) {
        info!(items = items.len(), "Reference kit set");
        self.kit.replace(items);
    }

    pub fn placement(&self) -> &PlacementSet {
        &self.placement
    }

    pub fn working_source(&self) -> Option<Position> {
        self.working_source
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    pub(crate) fn actuator(&self) -> Actuator {
        Actuator::new(
            Arc::clone(&self.world),
            self.policies.clone(),
            self.config.timing.clone(),
            self.config.tools.break_tools.clone(),
            self.cancel.clone(),
        )
    }

    // --- Stage entry points ---

    /// Index every storage container in range.
    pub async fn scan(&mut self) -> StageReport {
        self.begin(Stage::Scan).await;
        let result = stages::scan::run(self).await;
        self.finish(Stage::Scan, result).await
    }

    /// Load the Reference Kit from the reference container.
    pub async fn read_reference(&mut self) -> StageReport {
        self.begin(Stage::Reference).await;
        let result = stages::reference::run(self).await;
        self.finish(Stage::Reference, result).await
    }

    /// Withdraw empty containers from supply and place them.
    pub async fn place_containers(&mut self) -> StageReport {
        self.begin(Stage::Placement).await;
        let result = stages::placement::run(self).await;
        self.finish(Stage::Placement, result).await
    }

    /// Fetch one packaged container of `name` and place it as the Working
    /// Source.
    pub async fn acquire(&mut self, name: &str) -> StageReport {
        self.acquire_count(name, 1).await
    }

    pub async fn acquire_count(&mut self, name: &str, count: u32) -> StageReport {
        self.begin(Stage::Acquire).await;
        let result = stages::acquire::run(self, name, count).await;
        self.finish(Stage::Acquire, result).await
    }

    /// Distribute the Working Source's first item type into the placed
    /// containers.
    pub async fn fill(&mut self) -> StageReport {
        self.fill_item(None).await
    }

    /// Like [`Session::fill`], restricted to one item type.
    pub async fn fill_item(&mut self, item: Option<&str>) -> StageReport {
        self.begin(Stage::Fill).await;
        let result = stages::fill::run(self, item).await;
        self.finish(Stage::Fill, result).await
    }

    pub async fn dispose_working_source(&mut self) -> StageReport {
        self.begin(Stage::Dispose).await;
        let result = stages::dispose::run(self).await;
        self.finish(Stage::Dispose, result).await
    }

    /// Break every placed container and deliver them to the destination.
    pub async fn finalize(&mut self) -> StageReport {
        self.begin(Stage::Finalize).await;
        let result = stages::finalize::run(self).await;
        self.finish(Stage::Finalize, result).await
    }

    async fn begin(&self, stage: Stage) {
        info!(stage = %stage, "Stage started");
        self.progress.write().await.stage = Some(stage);
        self.events.publish(RunEvent::StageStarted {
            stage,
            timestamp: Utc::now(),
        });
    }

    /// Turn a stage result into its report, logging and publishing it.
    async fn finish(&self, stage: Stage, result: Result<StageReport, StageError>) -> StageReport {
        let report = match result {
            Ok(report) => report,
            Err(e) => StageReport::failure(stage, e.to_string()),
        };

        match report.status {
            Status::Success => info!(stage = %stage, message = %report.message, "Stage finished"),
            Status::Partial => {
                warn!(stage = %stage, message = %report.message, "Stage finished with failures")
            }
            Status::Failure => warn!(stage = %stage, message = %report.message, "Stage failed"),
        }

        {
            let mut progress = self.progress.write().await;
            progress.stage = None;
            progress.last_message = Some(report.to_string());
        }
        self.events.publish(RunEvent::StageFinished {
            stage,
            status: report.status,
            message: report.message.clone(),
            timestamp: Utc::now(),
        });
        report
    }
}
