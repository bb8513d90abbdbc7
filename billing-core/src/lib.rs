//! billing-core: domain layer of the subscription billing platform.
//!
//! Owns billing period advancement, the credit grant application state
//! machine, plan price synchronization, and pause/resume billing impact.
//! Persistence, invoicing, wallets, and webhooks are collaborator traits in
//! [`stores`]; this crate carries no transport or SQL of its own.

pub mod models;
pub mod services;
pub mod stores;
