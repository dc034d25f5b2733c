//! Run controller: drives a table through the pipeline row by row, owns
//! the lifecycle state machine, provider health, checkpoints, and
//! progress reporting.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ceofinder_shared::{
    EnrichmentStatus, ProgressEvent, Result, RowOutcome, RunMode, RunPhase, RunState,
};
use ceofinder_table::Table;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::pipeline::{Pipeline, ProviderOutcome};

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Cooperative pause/cancel flags, shared between the worker and whoever
/// drives it. Both are honored at row boundaries only; the in-flight row
/// always completes and its result is kept.
#[derive(Debug, Default)]
pub struct RunControls {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl RunControls {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Per-run settings. `output_path` receives checkpoints and the final
/// table; partial results survive cancellation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub output_path: PathBuf,
    /// Save the table after this many enriched rows.
    pub checkpoint_every: usize,
    /// Disable a provider after this many consecutive permanent errors.
    pub auth_failure_threshold: u32,
}

pub struct Runner {
    pipeline: Pipeline,
    options: RunOptions,
    controls: Arc<RunControls>,
    progress: mpsc::UnboundedSender<ProgressEvent>,
}

impl Runner {
    pub fn new(
        pipeline: Pipeline,
        options: RunOptions,
        controls: Arc<RunControls>,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Self {
        Self {
            pipeline,
            options,
            controls,
            progress,
        }
    }

    fn emit(&self, event: ProgressEvent) {
        // The display side may have gone away; the run does not care.
        let _ = self.progress.send(event);
    }

    /// Process every row the mode selects, mutating `table` in place.
    /// Returns the final state; the phase is `Completed` or `Cancelled`.
    #[instrument(skip_all, fields(mode = ?self.options.mode, rows = table.len()))]
    pub async fn run(&self, table: &mut Table) -> Result<RunState> {
        let mut state = RunState::new(self.options.mode, table.len());
        state.phase = RunPhase::Running;
        self.emit(ProgressEvent::Started {
            state: state.clone(),
        });

        let mut permanent_failures: HashMap<&'static str, u32> = HashMap::new();
        let mut disabled: HashSet<&'static str> = HashSet::new();

        for row_index in 0..table.len() {
            if self.wait_if_paused(&mut state).await {
                state.phase = RunPhase::Cancelled;
                break;
            }

            let record = table.record(row_index);
            let processed_before = state.processed;
            let outcome = match self.row_policy(&state, row_index, record.has_ceo()) {
                RowPolicy::Skip(outcome) => {
                    // Skipped rows keep their prior result and never count as
                    // processed; a row that already held a CEO still counts as
                    // succeeded.
                    if matches!(outcome, RowOutcome::AlreadyHadCeo) {
                        state.succeeded += 1;
                    }
                    outcome
                }
                RowPolicy::Enrich => {
                    let report = self.pipeline.enrich(&record, &disabled).await;
                    self.track_provider_health(
                        &report.outcomes,
                        &mut permanent_failures,
                        &mut disabled,
                    );

                    state.processed += 1;
                    match (report.result.status, report.result.candidate) {
                        (EnrichmentStatus::NotFound, _) | (_, None) => {
                            table.mark_not_found(row_index, "not_found");
                            state.failed += 1;
                            RowOutcome::NotFound
                        }
                        (_, Some(candidate)) => {
                            let source = report.result.source.as_deref().unwrap_or("unknown");
                            table.apply_candidate(row_index, &candidate, source);
                            state.succeeded += 1;
                            RowOutcome::Found
                        }
                    }
                }
            };

            let source = table.record(row_index).source;
            self.emit(ProgressEvent::Row {
                row_index,
                company: record.company,
                outcome,
                source,
                state: state.clone(),
            });

            if self.options.checkpoint_every > 0
                && state.processed > processed_before
                && state.processed % self.options.checkpoint_every == 0
            {
                // Checkpoints are best-effort; only the final save may fail
                // the run.
                if let Err(e) = table.save(&self.options.output_path) {
                    warn!(error = %e, "checkpoint save failed");
                }
            }
        }

        if state.phase != RunPhase::Cancelled {
            state.phase = RunPhase::Completed;
        }

        table.save(&self.options.output_path)?;
        info!(
            processed = state.processed,
            succeeded = state.succeeded,
            failed = state.failed,
            phase = ?state.phase,
            "run finished"
        );
        self.emit(ProgressEvent::Finished {
            state: state.clone(),
        });
        Ok(state)
    }

    /// Park while paused. Returns true when the run was cancelled.
    async fn wait_if_paused(&self, state: &mut RunState) -> bool {
        if self.controls.is_cancelled() {
            return true;
        }
        if !self.controls.is_paused() {
            return false;
        }

        debug!("run paused");
        state.phase = RunPhase::Paused;
        while self.controls.is_paused() {
            if self.controls.is_cancelled() {
                return true;
            }
            tokio::time::sleep(PAUSE_POLL).await;
        }
        debug!("run resumed");
        state.phase = RunPhase::Running;
        false
    }

    fn row_policy(&self, state: &RunState, row_index: usize, has_ceo: bool) -> RowPolicy {
        match state.mode {
            RunMode::All => RowPolicy::Enrich,
            RunMode::MissingOnly if has_ceo => RowPolicy::Skip(RowOutcome::AlreadyHadCeo),
            RunMode::MissingOnly => RowPolicy::Enrich,
            RunMode::Resume { start_index } if row_index < start_index => {
                // Rows before the resume point keep their previous result.
                RowPolicy::Skip(if has_ceo {
                    RowOutcome::AlreadyHadCeo
                } else {
                    RowOutcome::NotFound
                })
            }
            RunMode::Resume { .. } => RowPolicy::Enrich,
        }
    }

    fn track_provider_health(
        &self,
        outcomes: &[(&'static str, ProviderOutcome)],
        permanent_failures: &mut HashMap<&'static str, u32>,
        disabled: &mut HashSet<&'static str>,
    ) {
        for (provider, outcome) in outcomes {
            match outcome {
                ProviderOutcome::Permanent(reason) => {
                    let count = permanent_failures.entry(provider).or_insert(0);
                    *count += 1;
                    if *count >= self.options.auth_failure_threshold
                        && disabled.insert(provider)
                    {
                        warn!(
                            provider,
                            failures = *count,
                            "provider disabled for the remainder of the run"
                        );
                        self.emit(ProgressEvent::ProviderDisabled {
                            provider: provider.to_string(),
                            reason: reason.clone(),
                        });
                    }
                }
                ProviderOutcome::Accepted | ProviderOutcome::NoAnswer => {
                    permanent_failures.remove(provider);
                }
                // Transient failures say nothing about credentials.
                ProviderOutcome::Transient(_) => {}
            }
        }
    }
}

enum RowPolicy {
    Enrich,
    Skip(RowOutcome),
}
