// src/lib.rs

//! Aozora Bunko content retrieval, transformation and cache layer

pub mod error;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;
