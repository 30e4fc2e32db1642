//! Per-request evaluation: version resolution, access checks and path rules.
//!
//! The engine never suspends and never mutates the snapshot it reads. One
//! [`Engine::evaluate`] call produces exactly one [`DispatchDecision`].

pub mod access;
pub mod decision;
pub mod expiry;
pub mod pipeline;
pub mod request;
pub mod resolver;
pub mod respond;
pub mod rules;

pub use access::AccessGate;
pub use decision::DispatchDecision;
pub use expiry::{expiry_status, ExpiryStatus};
pub use pipeline::{Engine, DEFAULT_AUTH_HEADER};
pub use request::InboundRequest;
pub use resolver::{Resolution, VersionResolver};
pub use respond::{Dispatch, ProxyTarget, Responder};
pub use rules::{PathRuleEngine, RuleOutcome};

pub const APP_NAME: &str = env!("APP_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
