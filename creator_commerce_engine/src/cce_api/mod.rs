pub mod attribution_api;
pub mod ledger_api;
pub mod notification_api;
pub mod order_flow_api;
pub mod payout_api;

pub use attribution_api::AttributionResolver;
pub use ledger_api::LedgerApi;
pub use notification_api::NotificationApi;
pub use order_flow_api::{CommissionPolicy, OrderFlowApi, OrderPaidResult};
pub use payout_api::{ExecuteOutcome, ExecutionReport, PayoutApi, PayoutPolicy};
