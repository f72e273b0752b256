pub mod abi;
pub mod api;
pub mod cache;
pub mod config;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod roster;
pub mod rpc;
pub mod table;
