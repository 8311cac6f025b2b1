//! Port traits: the seams between the domain and the outside world.

pub mod bar_source;
pub mod config_port;
pub mod ledger_store;
pub mod notifier;
pub mod report_port;
