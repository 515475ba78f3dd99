//! # Creator Commerce Server
//!
//! The HTTP surface of the creator commerce gateway. It is responsible for:
//! * Listening for order webhooks from the e-commerce platform, verifying their HMAC
//!   signatures, and feeding them into the engine's order flow.
//! * Exposing the admin payout API (draft / approve / execute batches, ledger views,
//!   notification backfill) behind an API key.
//! * Running the commission maturity worker and the outbound notification hooks.
//!
//! ## Configuration
//! The server is configured via `CCG_*` environment variables. See [config](config/index.html).
//!
//! ## Routes
//! * `/health`: liveness check.
//! * `/shopify/webhook/*`: HMAC-verified platform webhooks (order created / paid, refund,
//!   cancellation).
//! * `/api/*`: admin endpoints, API-key gated.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod maturity_worker;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shopify_order;
pub mod shopify_routes;

#[cfg(test)]
mod endpoint_tests;
