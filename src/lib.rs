pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod fixture;
pub mod ledger;
pub mod orchestrator;
pub mod signer;
