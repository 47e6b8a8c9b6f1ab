//! The Sequencer: composes the stages into one full run.
//!
//! `Idle → ReferenceCheck → (ScanIfNeeded) → Placement → PerItem → Finalize → Done`,
//! with `Failed` reachable when no Reference Kit can be obtained or the run
//! is cancelled. Item-level failures are recorded and the loop moves on.

use chrono::Utc;
use kitsmith_core::{
    ItemOutcome, RunEvent, SequenceReport, SequenceState, Stage, StageReport, Status,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::Session;

const KIT_UNREADABLE: &str = "Reference kit is empty and could not read from reference chest";
const KIT_EMPTY: &str = "Reference kit is empty or not set";
const CANCELLED: &str = "Run cancelled";

impl Session {
    /// Run the whole pipeline under a fresh run id.
    pub async fn run_sequence(&mut self) -> SequenceReport {
        let run_id = Uuid::new_v4().to_string();
        self.run_sequence_as(&run_id).await
    }

    /// Run the whole pipeline, tagging events with `run_id`.
    pub async fn run_sequence_as(&mut self, run_id: &str) -> SequenceReport {
        info!(run_id = %run_id, kit = self.kit.len(), "Sequence started");
        {
            let mut progress = self.progress.write().await;
            progress.run_id = Some(run_id.to_string());
            progress.current_item = None;
        }

        let report = self.drive(run_id).await;

        match report.state {
            SequenceState::Failed => {
                warn!(run_id = %run_id, error = %report.message, "Sequence failed");
                self.events.publish(RunEvent::SequenceError {
                    run_id: run_id.to_string(),
                    error: report.message.clone(),
                    timestamp: Utc::now(),
                });
            }
            _ => {
                info!(
                    run_id = %run_id,
                    succeeded = report.succeeded_items(),
                    items = report.items.len(),
                    result = %report.message,
                    "Sequence finished"
                );
                self.events.publish(RunEvent::SequenceCompleted {
                    run_id: run_id.to_string(),
                    result: report.message.clone(),
                    timestamp: Utc::now(),
                });
            }
        }

        {
            let mut progress = self.progress.write().await;
            progress.state = SequenceState::Idle;
            progress.current_item = None;
            progress.last_message = Some(report.to_string());
        }
        report
    }

    async fn drive(&mut self, run_id: &str) -> SequenceReport {
        self.transition(run_id, SequenceState::ReferenceCheck).await;
        if self.kit.is_empty() {
            info!("Reference kit empty, reading reference container");
            let read = self.read_reference().await;
            if self.cancel.is_cancelled() {
                return self.fail(run_id, CANCELLED).await;
            }
            if self.kit.is_empty() {
                let message = if read.is_failure() { KIT_UNREADABLE } else { KIT_EMPTY };
                return self.fail(run_id, message).await;
            }
        }

        let mut report = SequenceReport {
            state: SequenceState::Done,
            status: Status::Success,
            message: String::new(),
            scan: None,
            placement: None,
            items: Vec::new(),
            finalize: None,
        };

        if self.first_run {
            self.first_run = false;
            self.transition(run_id, SequenceState::ScanIfNeeded).await;
            match self.store.load().await {
                Ok(index) if index.is_empty() => report.scan = Some(self.scan().await),
                Ok(index) => debug!(entries = index.len(), "Location index present, skipping scan"),
                Err(e) => warn!(error = %e, "Could not load location index, skipping scan"),
            }
            if self.cancel.is_cancelled() {
                return self.cancelled(run_id, report).await;
            }
        }

        self.transition(run_id, SequenceState::Placement).await;
        report.placement = Some(self.place_containers().await);
        if self.cancel.is_cancelled() {
            return self.cancelled(run_id, report).await;
        }

        self.transition(run_id, SequenceState::PerItem).await;
        let items = self.kit.items().to_vec();
        for item in items {
            self.progress.write().await.current_item = Some(item.clone());
            let outcome = self.process_item(&item).await;
            if self.cancel.is_cancelled() {
                report.items.push(outcome);
                return self.cancelled(run_id, report).await;
            }

            self.events.publish(RunEvent::ItemProcessed {
                run_id: run_id.to_string(),
                item: outcome.item.clone(),
                status: outcome.status,
                message: outcome.message.clone(),
                timestamp: Utc::now(),
            });
            report.items.push(outcome);
        }
        self.progress.write().await.current_item = None;

        self.transition(run_id, SequenceState::Finalize).await;
        let finalize = self.finalize().await;
        if self.cancel.is_cancelled() {
            return self.cancelled(run_id, report).await;
        }

        report.status = if finalize.is_failure() {
            Status::Failure
        } else if finalize.status == Status::Partial
            || report.items.iter().any(|o| o.status != Status::Success)
        {
            Status::Partial
        } else {
            Status::Success
        };
        report.message = finalize.to_string();
        report.finalize = Some(finalize);

        self.transition(run_id, SequenceState::Done).await;
        report
    }

    /// Acquire, fill and dispose one kit item. The outcome names the first
    /// failed stage. A placed working source is disposed even when the fill
    /// failed; a cancelled run leaves it where it is.
    async fn process_item(&mut self, item: &str) -> ItemOutcome {
        let acquired = self.acquire(item).await;
        if acquired.is_failure() && self.working_source.is_none() {
            return outcome(item, Stage::Acquire, &acquired);
        }

        let mut failed = acquired
            .is_failure()
            .then(|| outcome(item, Stage::Acquire, &acquired));
        let mut filled = None;
        if failed.is_none() {
            let report = self.fill_item(Some(item)).await;
            if report.is_failure() {
                failed = Some(outcome(item, Stage::Fill, &report));
            }
            filled = Some(report);
        }
        if let Some(failed) = failed.take_if(|_| self.cancel.is_cancelled()) {
            return failed;
        }

        let disposed = self.dispose_working_source().await;
        match (failed, filled) {
            (Some(failed), _) => {
                if disposed.is_failure() {
                    warn!(item = %item, error = %disposed.message, "Working source left in place");
                }
                failed
            }
            _ if disposed.is_failure() => outcome(item, Stage::Dispose, &disposed),
            (None, filled) => {
                let partial = [Some(&acquired), filled.as_ref(), Some(&disposed)]
                    .into_iter()
                    .flatten()
                    .any(|r| r.status == Status::Partial);
                ItemOutcome {
                    item: item.to_string(),
                    status: if partial { Status::Partial } else { Status::Success },
                    stage: Stage::Dispose,
                    message: filled.map_or(disposed.message, |r| r.message),
                }
            }
        }
    }

    async fn transition(&self, run_id: &str, state: SequenceState) {
        debug!(run_id = %run_id, state = %state, "Sequence state changed");
        self.progress.write().await.state = state;
        self.events.publish(RunEvent::StateChanged {
            run_id: run_id.to_string(),
            state,
            timestamp: Utc::now(),
        });
    }

    async fn fail(&self, run_id: &str, message: &str) -> SequenceReport {
        self.transition(run_id, SequenceState::Failed).await;
        SequenceReport::failed(message)
    }

    async fn cancelled(&self, run_id: &str, partial: SequenceReport) -> SequenceReport {
        self.transition(run_id, SequenceState::Failed).await;
        SequenceReport {
            state: SequenceState::Failed,
            status: Status::Failure,
            message: CANCELLED.to_string(),
            ..partial
        }
    }
}

fn outcome(item: &str, stage: Stage, report: &StageReport) -> ItemOutcome {
    warn!(item = %item, stage = %stage, error = %report.message, "Item failed, moving on");
    ItemOutcome {
        item: item.to_string(),
        status: Status::Failure,
        stage,
        message: report.message.clone(),
    }
}
