//! Serialised access to the single session.
//!
//! The actor has one position and one held item, so at most one operation
//! runs at a time. Requests arriving while one is in flight are rejected
//! with [`StageError::Busy`] rather than queued.

use futures::future::BoxFuture;
use kitsmith_core::{
    EventBus, ItemInfo, SequenceReport, StageError, StageReport, World,
};
use kitsmith_index::IndexStore;
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::kit::ReferenceKit;
use crate::session::{RunProgress, Session};

/// Snapshot returned by [`Controller::status`].
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub busy: bool,
    #[serde(flatten)]
    pub progress: RunProgress,
}

#[derive(Clone)]
pub struct Controller {
    session: Arc<Mutex<Session>>,
    world: Arc<dyn World>,
    store: Arc<dyn IndexStore>,
    events: Arc<EventBus>,
    progress: Arc<RwLock<RunProgress>>,
    cancel: Arc<StdMutex<CancellationToken>>,
}

impl Controller {
    pub fn new(session: Session) -> Self {
        Self {
            world: Arc::clone(session.world()),
            store: Arc::clone(session.store()),
            events: Arc::clone(session.events()),
            progress: Arc::clone(session.progress()),
            cancel: Arc::new(StdMutex::new(session.cancel_token().clone())),
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn world(&self) -> &Arc<dyn World> {
        &self.world
    }

    /// Install a fresh cancellation token for the next operation.
    fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut current) = self.cancel.lock() {
            *current = token.clone();
        }
        token
    }

    /// Run `op` against the session, or fail with `Busy`.
    async fn exclusive<T>(
        &self,
        op: impl for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, T>,
    ) -> Result<T, StageError> {
        let mut session = self.session.try_lock().map_err(|_| StageError::Busy)?;
        session.set_cancel_token(self.fresh_token());
        Ok(op(&mut *session).await)
    }

    pub async fn scan(&self) -> Result<StageReport, StageError> {
        self.exclusive(|s| Box::pin(s.scan())).await
    }

    pub async fn read_reference(&self) -> Result<StageReport, StageError> {
        self.exclusive(|s| Box::pin(s.read_reference())).await
    }

    pub async fn place_containers(&self) -> Result<StageReport, StageError> {
        self.exclusive(|s| Box::pin(s.place_containers())).await
    }

    pub async fn acquire(&self, item: &str) -> Result<StageReport, StageError> {
        let item = item.to_string();
        self.exclusive(move |s| Box::pin(async move { s.acquire(&item).await }))
            .await
    }

    pub async fn fill(&self) -> Result<StageReport, StageError> {
        self.exclusive(|s| Box::pin(s.fill())).await
    }

    pub async fn dispose_working_source(&self) -> Result<StageReport, StageError> {
        self.exclusive(|s| Box::pin(s.dispose_working_source())).await
    }

    pub async fn finalize(&self) -> Result<StageReport, StageError> {
        self.exclusive(|s| Box::pin(s.finalize())).await
    }

    /// Run the full sequence to completion.
    pub async fn run_sequence(&self) -> Result<SequenceReport, StageError> {
        self.exclusive(|s| Box::pin(s.run_sequence())).await
    }

    /// Start the full sequence in the background and return its run id.
    ///
    /// Completion is reported on the event bus.
    pub fn start_sequence(&self) -> Result<String, StageError> {
        let mut session = Arc::clone(&self.session)
            .try_lock_owned()
            .map_err(|_| StageError::Busy)?;
        session.set_cancel_token(self.fresh_token());

        let run_id = Uuid::new_v4().to_string();
        let id = run_id.clone();
        tokio::spawn(async move {
            let report = session.run_sequence_as(&id).await;
            info!(run_id = %id, status = ?report.status, "Background sequence ended");
        });
        Ok(run_id)
    }

    pub async fn set_kit(&self, items: Vec<String>) -> Result<ReferenceKit, StageError> {
        let mut session = self.session.try_lock().map_err(|_| StageError::Busy)?;
        session.set_kit(items);
        Ok(session.kit().clone())
    }

    pub async fn kit(&self) -> Result<ReferenceKit, StageError> {
        let session = self.session.try_lock().map_err(|_| StageError::Busy)?;
        Ok(session.kit().clone())
    }

    /// Item types present in the Location Index, resolved through the
    /// world's registry.
    pub async fn available_items(&self) -> Result<Vec<ItemInfo>, StageError> {
        let index = self.store.load().await?;
        Ok(index
            .item_ids()
            .into_iter()
            .filter_map(|id| {
                let info = self.world.item_by_id(id);
                if info.is_none() {
                    warn!(id = %id, "Indexed item id not in registry");
                }
                info
            })
            .collect())
    }

    /// The full item catalogue.
    pub fn items(&self) -> Vec<ItemInfo> {
        self.world.items()
    }

    /// Cancel the operation in flight. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        let busy = self.session.try_lock().is_err();
        if let Ok(token) = self.cancel.lock() {
            token.cancel();
        }
        if busy {
            info!("Cancellation requested");
        }
        busy
    }

    pub async fn status(&self) -> ControllerStatus {
        ControllerStatus {
            busy: self.session.try_lock().is_err(),
            progress: self.progress.read().await.clone(),
        }
    }
}
