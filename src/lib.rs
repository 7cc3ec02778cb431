#![allow(async_fn_in_trait)]
pub mod cli;
pub mod config;
pub mod error;
pub mod layer;
pub mod logging;
#[cfg(test)]
mod memory_store;
pub mod provider;
pub mod s3;
pub mod s3_operations;
pub mod stac_operations;
pub mod transfer;
