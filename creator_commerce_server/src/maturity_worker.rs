use chrono::Utc;
use creator_commerce_engine::{db_types::Commission, events::EventProducers, CommissionPolicy, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

const SWEEP_INTERVAL_SECS: u64 = 600;

/// Starts the commission maturity worker. Do not await the returned JoinHandle, as it runs
/// indefinitely.
///
/// Every sweep moves commissions still inside their hold to `Locked` and releases the ones
/// whose `lock_until` has passed to `Payable`, making them eligible for the next batch.
pub fn start_maturity_worker(db: SqliteDatabase, policy: CommissionPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        let api = OrderFlowApi::new(db, EventProducers::default(), policy);
        info!("🕰️ Commission maturity worker started");
        loop {
            timer.tick().await;
            debug!("🕰️ Running commission maturity sweep");
            match api.release_matured_commissions(Utc::now()).await {
                Ok(released) if released.is_empty() => {
                    debug!("🕰️ No commissions matured this sweep");
                },
                Ok(released) => {
                    info!("🕰️ {} commissions released to Payable: {}", released.len(), commission_list(&released));
                },
                Err(e) => {
                    error!("🕰️ Error running commission maturity sweep: {e}");
                },
            }
        }
    })
}

fn commission_list(commissions: &[Commission]) -> String {
    commissions
        .iter()
        .map(|c| format!("[{}] order: {} amount: {}", c.id, c.order_id, c.amount))
        .collect::<Vec<String>>()
        .join(", ")
}
