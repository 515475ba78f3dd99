pub mod chat;
pub mod rail;
pub mod shopify;
