use std::{fmt::Debug, time::Duration};

use ccg_common::{EurCents, EUR_CURRENCY_CODE};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db_types::{BatchStatus, CommissionStatus, IdempotencyCheck, ItemStatus, PayoutBatch, PayoutItem},
    events::{EventProducers, PayoutSentEvent},
    traits::{
        AttributionStore,
        IdempotencyManagement,
        ItemSettlement,
        PaymentRail,
        PayoutError,
        PayoutManagement,
        TransferRequest,
    },
};

/// Idempotency operation name for the batch-level execution request.
pub const OP_BATCH_EXECUTE: &str = "payout_batch_execute";
/// Idempotency operation name for individual item transfers.
pub const OP_PAYOUT_ITEM: &str = "payout_item";

/// Policy inputs for payout execution.
#[derive(Debug, Clone, Copy)]
pub struct PayoutPolicy {
    /// Flat fee deducted from each transfer; `net = amount - fee`.
    pub fee_per_transfer: EurCents,
    /// Upper bound on a single rail call. On expiry the outcome is unknown and the item is
    /// left in `Processing` for manual reconciliation.
    pub rail_timeout: Duration,
    /// Attempt budget for transient rail errors within one execution pass.
    pub max_transient_attempts: u32,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self { fee_per_transfer: EurCents::from(35), rail_timeout: Duration::from_secs(30), max_transient_attempts: 3 }
    }
}

/// Per-pass summary of what execution did to each item. Cached as the idempotency response
/// for the batch execution key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub batch_id: i64,
    pub settled: Vec<i64>,
    pub failed: Vec<(i64, String)>,
    pub skipped: Vec<i64>,
    /// Items whose outcome is unknown (timeouts, crashed predecessors). They stay in
    /// `Processing` and need manual reconciliation against the rail.
    pub unknown: Vec<i64>,
    pub final_status: Option<BatchStatus>,
}

/// The result of an execution request.
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// This request ran the pass and produced the report.
    Executed(ExecutionReport),
    /// A previous execution already completed; its cached report is returned verbatim.
    Replayed(serde_json::Value),
    /// An execution pass is in flight elsewhere. Nothing was done.
    InFlight,
}

/// The payout batch state machine.
///
/// `Draft → Approved → Executing → Completed | Partial | Failed`, with the terminal status
/// derived from item states. Execution is guarded by a batch-level idempotency key (at most
/// one pass in flight, retried requests replay the cached report) and each item transfer by
/// its own key, so a retried pass can never double-send.
pub struct PayoutApi<B, R> {
    db: B,
    rail: R,
    producers: EventProducers,
    policy: PayoutPolicy,
}

impl<B, R> Debug for PayoutApi<B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B, R> PayoutApi<B, R> {
    pub fn new(db: B, rail: R, producers: EventProducers, policy: PayoutPolicy) -> Self {
        Self { db, rail, producers, policy }
    }
}

impl<B, R> PayoutApi<B, R>
where
    B: PayoutManagement + IdempotencyManagement + AttributionStore,
    R: PaymentRail,
{
    /// Drafts a new batch from the currently payable commissions.
    pub async fn create_batch(&self) -> Result<(PayoutBatch, Vec<PayoutItem>), PayoutError> {
        self.db.create_payout_batch(self.policy.fee_per_transfer).await
    }

    /// `Draft → Approved`, re-validating every item's commission at approval time.
    pub async fn approve_batch(&self, batch_id: i64) -> Result<PayoutBatch, PayoutError> {
        self.db.approve_payout_batch(batch_id).await
    }

    pub async fn batch(&self, batch_id: i64) -> Result<(PayoutBatch, Vec<PayoutItem>), PayoutError> {
        self.db.fetch_payout_batch(batch_id).await
    }

    pub async fn batches(&self) -> Result<Vec<PayoutBatch>, PayoutError> {
        self.db.list_payout_batches().await
    }

    /// Runs one execution pass over the batch.
    ///
    /// The batch-level idempotency key makes this safe to call again after a timeout without
    /// knowing whether the first request fired transfers: a completed pass replays its
    /// report, an in-flight pass answers [`ExecuteOutcome::InFlight`], and a failed pass is
    /// resumed — item-level keys protect everything already sent.
    pub async fn execute_batch(&self, batch_id: i64) -> Result<ExecuteOutcome, PayoutError> {
        let natural_key = batch_id.to_string();
        match self.db.acquire_idempotency_key(OP_BATCH_EXECUTE, &natural_key).await? {
            IdempotencyCheck::Completed(response) => {
                info!("💸️ Execution of batch #{batch_id} replayed. Returning the cached report.");
                return Ok(ExecuteOutcome::Replayed(response));
            },
            IdempotencyCheck::InFlight => {
                info!("💸️ Execution of batch #{batch_id} is already in flight. Backing off.");
                return Ok(ExecuteOutcome::InFlight);
            },
            IdempotencyCheck::New => {},
            IdempotencyCheck::RetryAfterFailure(last_error) => {
                info!("💸️ Resuming execution of batch #{batch_id} after earlier failure: {last_error}");
            },
        }
        match self.run_execution(batch_id).await {
            Ok(report) => {
                let response = serde_json::to_value(&report)
                    .unwrap_or_else(|_| json!({ "batch_id": batch_id, "final_status": report.final_status }));
                self.db.complete_idempotency_key(OP_BATCH_EXECUTE, &natural_key, &response).await?;
                Ok(ExecuteOutcome::Executed(report))
            },
            Err(e) => {
                if let Err(mark) = self.db.fail_idempotency_key(OP_BATCH_EXECUTE, &natural_key, &e.to_string()).await {
                    error!("💸️ Could not mark execution key for batch #{batch_id} as failed: {mark}");
                }
                Err(e)
            },
        }
    }

    async fn run_execution(&self, batch_id: i64) -> Result<ExecutionReport, PayoutError> {
        let (batch, items) = self.db.fetch_payout_batch(batch_id).await?;
        let mut report = ExecutionReport { batch_id, ..ExecutionReport::default() };
        match batch.status {
            BatchStatus::Approved => {
                self.db.start_batch_execution(batch_id).await?;
            },
            // A resumed pass after an earlier failure; items already settled are protected by
            // their own keys and statuses.
            BatchStatus::Executing => {
                info!("💸️ Batch #{batch_id} is already Executing. Resuming the pass.");
            },
            status if status.is_terminal() => {
                debug!("💸️ Batch #{batch_id} is already {status}. Nothing to execute.");
                for item in &items {
                    record_existing(&mut report, item);
                }
                report.final_status = Some(status);
                return Ok(report);
            },
            status => {
                return Err(PayoutError::BatchNotInStatus { batch_id, expected: BatchStatus::Approved, actual: status })
            },
        }
        info!("💸️ Executing batch #{batch_id} with {} items", items.len());
        for item in &items {
            self.process_item(item, &mut report).await?;
        }
        let batch = self.db.finalize_payout_batch(batch_id).await?;
        report.final_status = Some(batch.status);
        info!(
            "💸️ Batch #{batch_id} pass complete: {} settled, {} failed, {} skipped, {} unknown. Status: {}",
            report.settled.len(),
            report.failed.len(),
            report.skipped.len(),
            report.unknown.len(),
            batch.status
        );
        Ok(report)
    }

    /// Drives one item through `Pending → Processing → Completed|Failed|Skipped`. Only
    /// `Pending` items are picked up; anything else is recorded and left alone — in
    /// particular an item stranded in `Processing` by a crashed pass is *never* re-sent.
    async fn process_item(&self, item: &PayoutItem, report: &mut ExecutionReport) -> Result<(), PayoutError> {
        match item.status {
            ItemStatus::Pending => {},
            ItemStatus::Processing => {
                warn!(
                    "💸️ Item {} is Processing from a previous pass with an unknown outcome. Reconcile it against the \
                     rail manually.",
                    item.id
                );
                report.unknown.push(item.id);
                return Ok(());
            },
            existing => {
                record_existing(report, item);
                debug!("💸️ Item {} is already {existing}. Skipping.", item.id);
                return Ok(());
            },
        }
        // A refund can cancel the commission between approval and execution.
        let commission = self.db.fetch_item_commission(item.id).await?;
        if commission.status != CommissionStatus::Payable {
            let reason = format!("Commission {} is {}, not Payable", commission.id, commission.status);
            self.db.skip_payout_item(item.id, &reason).await?;
            report.skipped.push(item.id);
            return Ok(());
        }
        let natural_key = item.id.to_string();
        match self.db.acquire_idempotency_key(OP_PAYOUT_ITEM, &natural_key).await? {
            IdempotencyCheck::New | IdempotencyCheck::RetryAfterFailure(_) => {},
            IdempotencyCheck::InFlight => {
                warn!("💸️ Item {} has an in-flight transfer elsewhere. Leaving it alone.", item.id);
                report.unknown.push(item.id);
                return Ok(());
            },
            IdempotencyCheck::Completed(_) => {
                // The transfer went out but the settlement did not stick. Do not send again.
                warn!(
                    "💸️ Item {} has a completed transfer key but is still Pending. Reconcile it manually; it will not \
                     be re-sent.",
                    item.id
                );
                report.unknown.push(item.id);
                return Ok(());
            },
        }
        let item = self.db.mark_item_processing(item.id).await?;
        let destination = match self.destination_for(&item).await? {
            Ok(iban) => iban,
            Err(reason) => {
                self.db.fail_payout_item(item.id, &reason).await?;
                self.db.fail_idempotency_key(OP_PAYOUT_ITEM, &natural_key, &reason).await?;
                report.failed.push((item.id, reason));
                return Ok(());
            },
        };
        let request = TransferRequest {
            reference: format!("{OP_PAYOUT_ITEM}_{}", item.id),
            destination,
            amount: item.net_amount,
            currency: EUR_CURRENCY_CODE.to_string(),
            description: format!("Creator payout, batch #{} item {}", item.batch_id, item.id),
        };
        self.send_with_retries(&item, &request, report).await
    }

    async fn destination_for(&self, item: &PayoutItem) -> Result<Result<String, String>, PayoutError> {
        let creator = self.db.fetch_creator(item.creator_id).await?;
        Ok(match creator.and_then(|c| c.iban) {
            Some(iban) => Ok(iban),
            None => Err(format!("Creator #{} has no bank details on file", item.creator_id)),
        })
    }

    async fn send_with_retries(
        &self,
        item: &PayoutItem,
        request: &TransferRequest,
        report: &mut ExecutionReport,
    ) -> Result<(), PayoutError> {
        let natural_key = item.id.to_string();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = tokio::time::timeout(self.policy.rail_timeout, self.rail.send_transfer(request)).await;
            match outcome {
                Err(_) => {
                    // Unknown outcome: the item stays Processing and its key stays
                    // Processing, forcing manual reconciliation instead of a guess.
                    warn!("💸️ Rail call for item {} timed out after {:?}. Outcome unknown.", item.id, self.policy.rail_timeout);
                    report.unknown.push(item.id);
                    return Ok(());
                },
                Ok(Err(e)) if e.is_unknown_outcome() => {
                    warn!("💸️ Rail reported an unknown outcome for item {}: {e}", item.id);
                    report.unknown.push(item.id);
                    return Ok(());
                },
                Ok(Ok(receipt)) => {
                    let settlement = self.db.settle_payout_item(item.id, &receipt.transfer_id).await?;
                    self.db
                        .complete_idempotency_key(OP_PAYOUT_ITEM, &natural_key, &json!({ "transfer_id": receipt.transfer_id }))
                        .await?;
                    self.call_payout_sent_hook(&settlement).await;
                    report.settled.push(item.id);
                    return Ok(());
                },
                Ok(Err(e)) if e.is_permanent() || attempt >= self.policy.max_transient_attempts => {
                    let reason = e.to_string();
                    self.db.fail_payout_item(item.id, &reason).await?;
                    self.db.fail_idempotency_key(OP_PAYOUT_ITEM, &natural_key, &reason).await?;
                    report.failed.push((item.id, reason));
                    return Ok(());
                },
                Ok(Err(e)) => {
                    debug!("💸️ Transient rail error for item {} (attempt {attempt}): {e}. Retrying.", item.id);
                },
            }
        }
    }

    async fn call_payout_sent_hook(&self, settlement: &ItemSettlement) {
        for emitter in &self.producers.payout_sent_producer {
            debug!("💸️ Notifying payout sent hook subscribers");
            let event = PayoutSentEvent {
                item: settlement.item.clone(),
                commission: settlement.commission.clone(),
                ledger_entry: settlement.payout_entry.clone(),
            };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn record_existing(report: &mut ExecutionReport, item: &PayoutItem) {
    match item.status {
        ItemStatus::Completed => report.settled.push(item.id),
        ItemStatus::Failed => report.failed.push((item.id, item.error.clone().unwrap_or_default())),
        ItemStatus::Skipped => report.skipped.push(item.id),
        ItemStatus::Processing => report.unknown.push(item.id),
        ItemStatus::Pending => {},
    }
}
