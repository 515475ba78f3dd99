use std::{fmt::Display, str::FromStr};

use ccg_common::{CommissionRate, EurCents, EUR_CURRENCY_CODE};
use chrono::{DateTime, Duration, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The order id assigned by the e-commerce platform. This is the natural key for orders; the
/// internal row id is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created but payment has not been captured yet.
    Pending,
    /// Payment for the order has been captured.
    Confirmed,
    /// The order was refunded after payment.
    Refunded,
    /// The order was cancelled before payment.
    Canceled,
}

impl OrderStatusType {
    /// Refunds are the only transition allowed out of a terminal status, and only from
    /// `Confirmed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Refunded | OrderStatusType::Canceled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Refunded => write!(f, "Refunded"),
            OrderStatusType::Canceled => write!(f, "Canceled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Refunded" => Ok(Self::Refunded),
            "Canceled" => Ok(Self::Canceled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------   CommissionStatus    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CommissionStatus {
    /// Newly created; the maturity worker has not looked at it yet.
    Pending,
    /// Inside the maturity hold. Not eligible for payout until `lock_until` passes.
    Locked,
    /// Mature and eligible for inclusion in a payout batch.
    Payable,
    /// Money has been transferred to the creator.
    Paid,
    /// Annulled, e.g. because the order was refunded. Reachable from every state except `Paid`
    /// via the normal flow; paying out a cancelled commission is forbidden.
    Canceled,
}

impl CommissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommissionStatus::Paid | CommissionStatus::Canceled)
    }
}

impl Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionStatus::Pending => write!(f, "Pending"),
            CommissionStatus::Locked => write!(f, "Locked"),
            CommissionStatus::Payable => write!(f, "Payable"),
            CommissionStatus::Paid => write!(f, "Paid"),
            CommissionStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

impl FromStr for CommissionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Locked" => Ok(Self::Locked),
            "Payable" => Ok(Self::Payable),
            "Paid" => Ok(Self::Paid),
            "Canceled" => Ok(Self::Canceled),
            s => Err(ConversionError(format!("Invalid commission status: {s}"))),
        }
    }
}

//--------------------------------------    CreatorStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CreatorStatus {
    Active,
    Inactive,
}

impl Display for CreatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreatorStatus::Active => write!(f, "Active"),
            CreatorStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

impl FromStr for CreatorStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Inactive" => Ok(Self::Inactive),
            s => Err(ConversionError(format!("Invalid creator status: {s}"))),
        }
    }
}

//--------------------------------------  AttributionSource    -------------------------------------------------------
/// Where an order's attribution came from. Sources are ordered: explicit signals outrank
/// inferred ones, so [`AttributionSource::priority`] drives the resolver cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AttributionSource {
    /// `creator_id`/`routine_id` note attributes set at checkout. Explicit intent.
    CartAttributes,
    /// A server-side checkout-session record matched on the cart token.
    CheckoutSession,
    /// The order's discount code matched a creator's unique code. Codes can be shared or
    /// guessed, so this is the weakest signal.
    DiscountCode,
}

impl AttributionSource {
    pub fn priority(&self) -> u8 {
        match self {
            AttributionSource::CartAttributes => 3,
            AttributionSource::CheckoutSession => 2,
            AttributionSource::DiscountCode => 1,
        }
    }
}

impl Display for AttributionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributionSource::CartAttributes => write!(f, "CartAttributes"),
            AttributionSource::CheckoutSession => write!(f, "CheckoutSession"),
            AttributionSource::DiscountCode => write!(f, "DiscountCode"),
        }
    }
}

impl FromStr for AttributionSource {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CartAttributes" => Ok(Self::CartAttributes),
            "CheckoutSession" => Ok(Self::CheckoutSession),
            "DiscountCode" => Ok(Self::DiscountCode),
            s => Err(ConversionError(format!("Invalid attribution source: {s}"))),
        }
    }
}

//--------------------------------------     Attribution       -------------------------------------------------------
/// The result of a successful attribution resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub creator_id: i64,
    pub routine_id: Option<i64>,
    pub source: AttributionSource,
}

impl Attribution {
    pub fn priority(&self) -> u8 {
        self.source.priority()
    }
}

//--------------------------------------       Creator         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Creator {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Unique, matched case-insensitively during attribution.
    pub discount_code: String,
    /// The creator's *current* rate. Commissions snapshot this at creation time and never
    /// follow later changes.
    pub commission_rate: CommissionRate,
    pub status: CreatorStatus,
    pub iban: Option<String>,
    pub bank_verified: bool,
    /// Set when a ledger-integrity check failed. Blocks all further ledger writes for this
    /// creator until an operator intervenes.
    pub ledger_frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Creator {
    pub fn is_payable(&self) -> bool {
        self.status == CreatorStatus::Active && self.bank_verified && !self.ledger_frozen
    }
}

#[derive(Debug, Clone)]
pub struct NewCreator {
    pub name: String,
    pub email: String,
    pub discount_code: String,
    pub commission_rate: CommissionRate,
    pub iban: Option<String>,
    pub bank_verified: bool,
}

impl NewCreator {
    pub fn new<S: Into<String>>(name: S, email: S, discount_code: S, commission_rate: CommissionRate) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            discount_code: discount_code.into(),
            commission_rate,
            iban: None,
            bank_verified: false,
        }
    }

    pub fn with_bank_account<S: Into<String>>(mut self, iban: S, verified: bool) -> Self {
        self.iban = Some(iban.into());
        self.bank_verified = verified;
        self
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub order_number: Option<String>,
    pub customer_email: Option<String>,
    /// Commission base. Excludes shipping and tax.
    pub subtotal: EurCents,
    pub total: EurCents,
    pub currency: String,
    pub discount_code: Option<String>,
    pub cart_token: Option<String>,
    pub creator_id: Option<i64>,
    pub routine_id: Option<i64>,
    pub attribution_source: Option<AttributionSource>,
    pub status: OrderStatusType,
    pub ordered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// An inbound order event, as delivered by the platform webhook. Carries the raw attribution
/// signals (note attributes, cart token, discount code) that the resolver works from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub order_number: Option<String>,
    pub customer_email: Option<String>,
    pub subtotal: EurCents,
    pub total: EurCents,
    pub currency: String,
    pub discount_code: Option<String>,
    pub cart_token: Option<String>,
    /// `creator_id` note attribute, if the checkout set one.
    pub note_creator_id: Option<i64>,
    /// `routine_id` note attribute, if the checkout set one.
    pub note_routine_id: Option<i64>,
    pub ordered_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, subtotal: EurCents, total: EurCents, ordered_at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            order_number: None,
            customer_email: None,
            subtotal,
            total,
            currency: EUR_CURRENCY_CODE.to_string(),
            discount_code: None,
            cart_token: None,
            note_creator_id: None,
            note_routine_id: None,
            ordered_at,
        }
    }

    pub fn with_discount_code<S: Into<String>>(mut self, code: S) -> Self {
        self.discount_code = Some(code.into());
        self
    }

    pub fn with_cart_token<S: Into<String>>(mut self, token: S) -> Self {
        self.cart_token = Some(token.into());
        self
    }

    pub fn with_note_attributes(mut self, creator_id: Option<i64>, routine_id: Option<i64>) -> Self {
        self.note_creator_id = creator_id;
        self.note_routine_id = routine_id;
        self
    }
}

impl Display for NewOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order {} ({} subtotal, {} total)", self.order_id, self.subtotal, self.total)
    }
}

//--------------------------------------      Commission       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    /// External order id. Unique, so an order can never carry two commissions.
    pub order_id: OrderId,
    pub creator_id: i64,
    /// Snapshot of the order subtotal the commission was computed from.
    pub order_subtotal: EurCents,
    /// Snapshot of the creator's rate at creation time.
    pub rate: CommissionRate,
    /// `order_subtotal × rate`, frozen at creation. Never recomputed.
    pub amount: EurCents,
    pub status: CommissionStatus,
    pub lock_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCommission {
    pub order_id: OrderId,
    pub creator_id: i64,
    pub order_subtotal: EurCents,
    pub rate: CommissionRate,
    pub amount: EurCents,
    pub lock_until: Option<DateTime<Utc>>,
}

impl NewCommission {
    /// Computes the commission for an order at the creator's current rate, freezing both the
    /// rate and the resulting amount. `maturity` is the refund-protection hold; `None` makes
    /// the commission payable immediately.
    pub fn for_order(order: &Order, creator: &Creator, maturity: Option<Duration>) -> Self {
        let rate = creator.commission_rate;
        let amount = rate.apply(order.subtotal);
        let lock_until = maturity.map(|d| order.ordered_at + d);
        Self { order_id: order.order_id.clone(), creator_id: creator.id, order_subtotal: order.subtotal, rate, amount, lock_until }
    }
}

//--------------------------------------   CheckoutSession     -------------------------------------------------------
/// A cart-token to creator mapping recorded by the checkout flow. Read-only from this
/// subsystem's perspective.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: i64,
    pub cart_token: String,
    pub creator_id: i64,
    pub routine_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  IdempotencyStatus    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum IdempotencyStatus {
    Processing,
    Completed,
    Failed,
}

impl Display for IdempotencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdempotencyStatus::Processing => write!(f, "Processing"),
            IdempotencyStatus::Completed => write!(f, "Completed"),
            IdempotencyStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for IdempotencyStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid idempotency status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct IdempotencyRecord {
    pub id: i64,
    pub operation: String,
    pub natural_key: String,
    pub status: IdempotencyStatus,
    /// JSON response cached on completion, replayed verbatim to redeliveries.
    pub response: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a caller learns when it tries to acquire an idempotency key.
#[derive(Debug, Clone)]
pub enum IdempotencyCheck {
    /// The key was acquired (status `Processing`); the caller owns the operation.
    New,
    /// Another worker holds the key. Back off; do not run the operation.
    InFlight,
    /// The operation already ran; here is its cached response.
    Completed(serde_json::Value),
    /// A previous attempt failed with this error. The record has been reset to `Processing`
    /// and the caller owns the retry.
    RetryAfterFailure(String),
}

//--------------------------------------    LedgerEntryType    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LedgerEntryType {
    CommissionEarned,
    PayoutSent,
    PayoutFee,
    CommissionCanceled,
    Adjustment,
}

impl Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryType::CommissionEarned => write!(f, "CommissionEarned"),
            LedgerEntryType::PayoutSent => write!(f, "PayoutSent"),
            LedgerEntryType::PayoutFee => write!(f, "PayoutFee"),
            LedgerEntryType::CommissionCanceled => write!(f, "CommissionCanceled"),
            LedgerEntryType::Adjustment => write!(f, "Adjustment"),
        }
    }
}

impl FromStr for LedgerEntryType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CommissionEarned" => Ok(Self::CommissionEarned),
            "PayoutSent" => Ok(Self::PayoutSent),
            "PayoutFee" => Ok(Self::PayoutFee),
            "CommissionCanceled" => Ok(Self::CommissionCanceled),
            "Adjustment" => Ok(Self::Adjustment),
            s => Err(ConversionError(format!("Invalid ledger entry type: {s}"))),
        }
    }
}

//--------------------------------------      LedgerEntry      -------------------------------------------------------
/// One immutable row of a creator's financial history. `balance_after` is computed by the
/// storage layer in the same statement as the insert; entries are never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub creator_id: i64,
    pub entry_type: LedgerEntryType,
    pub amount: EurCents,
    pub balance_after: EurCents,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     Notification      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub creator_id: i64,
    pub ledger_entry_id: Option<i64>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub amount: Option<EurCents>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub creator_id: i64,
    pub ledger_entry_id: Option<i64>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub amount: Option<EurCents>,
}

impl NewNotification {
    pub fn new(creator_id: i64, kind: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            creator_id,
            ledger_entry_id: None,
            kind: kind.into(),
            title: title.into(),
            message: message.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: EurCents) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn for_ledger_entry(mut self, entry_id: i64) -> Self {
        self.ledger_entry_id = Some(entry_id);
        self
    }
}

//--------------------------------------     BatchStatus       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum BatchStatus {
    Draft,
    Approved,
    Executing,
    Completed,
    Partial,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Partial | BatchStatus::Failed)
    }
}

impl Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Draft => write!(f, "Draft"),
            BatchStatus::Approved => write!(f, "Approved"),
            BatchStatus::Executing => write!(f, "Executing"),
            BatchStatus::Completed => write!(f, "Completed"),
            BatchStatus::Partial => write!(f, "Partial"),
            BatchStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for BatchStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Approved" => Ok(Self::Approved),
            "Executing" => Ok(Self::Executing),
            "Completed" => Ok(Self::Completed),
            "Partial" => Ok(Self::Partial),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid batch status: {s}"))),
        }
    }
}

//--------------------------------------      ItemStatus       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl ItemStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Skipped)
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "Pending"),
            ItemStatus::Processing => write!(f, "Processing"),
            ItemStatus::Completed => write!(f, "Completed"),
            ItemStatus::Failed => write!(f, "Failed"),
            ItemStatus::Skipped => write!(f, "Skipped"),
        }
    }
}

impl FromStr for ItemStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Skipped" => Ok(Self::Skipped),
            s => Err(ConversionError(format!("Invalid payout item status: {s}"))),
        }
    }
}

//--------------------------------------     PayoutBatch       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PayoutBatch {
    pub id: i64,
    pub status: BatchStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PayoutItem {
    pub id: i64,
    pub batch_id: i64,
    pub commission_id: i64,
    pub creator_id: i64,
    pub amount: EurCents,
    pub fee: EurCents,
    /// `amount - fee`; what the rail actually transfers.
    pub net_amount: EurCents,
    pub status: ItemStatus,
    pub transfer_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derives a batch's terminal status from its item statuses. The batch row never stores a
/// terminal status that contradicts its items; this function is the single source of truth.
///
/// `Skipped` items are excluded from the all-completed/all-failed checks: a batch whose only
/// unskipped items all completed is `Completed`.
pub fn derive_terminal_status(items: &[ItemStatus]) -> BatchStatus {
    let settled: Vec<&ItemStatus> = items.iter().filter(|s| !matches!(s, ItemStatus::Skipped)).collect();
    if settled.is_empty() {
        return BatchStatus::Failed;
    }
    if settled.iter().all(|s| matches!(s, ItemStatus::Completed)) {
        BatchStatus::Completed
    } else if settled.iter().all(|s| matches!(s, ItemStatus::Failed)) {
        BatchStatus::Failed
    } else {
        BatchStatus::Partial
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminal_status_derivation() {
        use ItemStatus::*;
        assert_eq!(derive_terminal_status(&[Completed, Completed]), BatchStatus::Completed);
        assert_eq!(derive_terminal_status(&[Failed, Failed]), BatchStatus::Failed);
        assert_eq!(derive_terminal_status(&[Completed, Failed, Completed]), BatchStatus::Partial);
        assert_eq!(derive_terminal_status(&[Completed, Skipped]), BatchStatus::Completed);
        assert_eq!(derive_terminal_status(&[Skipped, Skipped]), BatchStatus::Failed);
        // An item stuck in Processing (unknown outcome) keeps the batch out of Completed.
        assert_eq!(derive_terminal_status(&[Completed, Processing]), BatchStatus::Partial);
    }

    #[test]
    fn status_round_trips() {
        for s in ["Pending", "Confirmed", "Refunded", "Canceled"] {
            assert_eq!(s.parse::<OrderStatusType>().unwrap().to_string(), s);
        }
        for s in ["Pending", "Locked", "Payable", "Paid", "Canceled"] {
            assert_eq!(s.parse::<CommissionStatus>().unwrap().to_string(), s);
        }
        for s in ["Draft", "Approved", "Executing", "Completed", "Partial", "Failed"] {
            assert_eq!(s.parse::<BatchStatus>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn attribution_priorities() {
        assert!(AttributionSource::CartAttributes.priority() > AttributionSource::CheckoutSession.priority());
        assert!(AttributionSource::CheckoutSession.priority() > AttributionSource::DiscountCode.priority());
    }
}
