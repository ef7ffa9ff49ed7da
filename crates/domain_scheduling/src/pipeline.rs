//! Scheduled payment trigger pipeline
//!
//! One run covers one area. Pending items are read page by page until the
//! number fetched reaches the total reported by the most recent page, or a
//! page comes back empty. The total is re-read on every page because other
//! writers keep adding scheduled payments while a run is in progress.
//!
//! All pages are read before anything is dispatched. Dispatching moves
//! items out of PENDING, which would otherwise shift the offsets of the
//! pages still to be read.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{PageRequest, ScheduledPaymentId};

use crate::config::SchedulingConfig;
use crate::error::SchedulingError;
use crate::handler::{InitialServiceCompletedHandler, TriggerOutcome};
use crate::ports::ScheduledPaymentRepository;
use crate::scheduled::{ScheduledPayment, TriggerType};

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRunSummary {
    pub area: String,
    /// Distinct scheduled payments read
    pub fetched: usize,
    pub submitted: usize,
    pub cancelled: usize,
    /// Left pending for the next run
    pub failed: usize,
}

impl TriggerRunSummary {
    fn new(area: &str) -> Self {
        Self {
            area: area.to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for TriggerRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "area={} fetched={} submitted={} cancelled={} failed={}",
            self.area, self.fetched, self.submitted, self.cancelled, self.failed
        )
    }
}

pub struct TriggerPipeline {
    scheduled: Arc<dyn ScheduledPaymentRepository>,
    initial_service_completed: InitialServiceCompletedHandler,
    config: SchedulingConfig,
}

impl TriggerPipeline {
    pub fn new(
        scheduled: Arc<dyn ScheduledPaymentRepository>,
        initial_service_completed: InitialServiceCompletedHandler,
        config: SchedulingConfig,
    ) -> Result<Self, SchedulingError> {
        config.validate()?;
        Ok(Self {
            scheduled,
            initial_service_completed,
            config,
        })
    }

    /// Processes every pending scheduled payment in `area`
    #[instrument(skip(self))]
    pub async fn run(&self, area: &str) -> Result<TriggerRunSummary, SchedulingError> {
        let pending = self.fetch_pending(area).await?;
        let mut summary = TriggerRunSummary::new(area);
        summary.fetched = pending.len();

        for mut item in pending {
            match self.dispatch(&item).await {
                Ok(TriggerOutcome::Submitted(payment_id)) => {
                    item.mark_submitted(payment_id);
                    self.persist(&mut summary, &item, |s| s.submitted += 1).await;
                }
                Ok(TriggerOutcome::Failed(reason)) => {
                    warn!(scheduled_payment_id = %item.id, reason = %reason, "Scheduled payment left pending");
                    summary.failed += 1;
                }
                Err(SchedulingError::ScheduledPaymentTriggerMetadataInvalid { reason, .. }) => {
                    warn!(scheduled_payment_id = %item.id, reason = %reason, "Cancelling scheduled payment");
                    item.cancel(reason);
                    self.persist(&mut summary, &item, |s| s.cancelled += 1).await;
                }
                Err(e) if e.is_fatal() => {
                    error!(scheduled_payment_id = %item.id, error = %e, "Trigger run aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(scheduled_payment_id = %item.id, error = %e, "Scheduled payment left pending");
                    summary.failed += 1;
                }
            }
        }

        info!(
            area,
            fetched = summary.fetched,
            submitted = summary.submitted,
            cancelled = summary.cancelled,
            failed = summary.failed,
            "Trigger run complete"
        );
        Ok(summary)
    }

    async fn dispatch(&self, item: &ScheduledPayment) -> Result<TriggerOutcome, SchedulingError> {
        match item.trigger_type {
            TriggerType::InitialServiceCompleted => self.initial_service_completed.handle(item).await,
            TriggerType::NextServiceCompleted => Err(
                SchedulingError::ScheduledPaymentTriggerNotImplemented(item.trigger_type),
            ),
        }
    }

    async fn persist(
        &self,
        summary: &mut TriggerRunSummary,
        item: &ScheduledPayment,
        count: impl FnOnce(&mut TriggerRunSummary),
    ) {
        match self.scheduled.update(item).await {
            Ok(()) => count(summary),
            Err(e) => {
                error!(scheduled_payment_id = %item.id, status = %item.status, error = %e, "Failed to persist scheduled payment");
                summary.failed += 1;
            }
        }
    }

    async fn fetch_pending(&self, area: &str) -> Result<Vec<ScheduledPayment>, SchedulingError> {
        let mut seen: HashSet<ScheduledPaymentId> = HashSet::new();
        let mut items = Vec::new();
        let mut request = PageRequest::new(0, self.config.page_size);
        let mut fetched: u64 = 0;

        loop {
            let page = self.scheduled.find_pending(area, request).await?;
            if page.items.is_empty() {
                break;
            }
            fetched += page.items.len() as u64;
            debug!(offset = request.offset, returned = page.items.len(), total = page.total, "Fetched pending page");

            for item in page.items {
                if seen.insert(item.id) {
                    items.push(item);
                }
            }
            if fetched >= page.total {
                break;
            }
            request = request.next();
        }

        Ok(items)
    }
}
