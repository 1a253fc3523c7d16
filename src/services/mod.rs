// src/services/mod.rs

pub mod reindex;
pub mod scoring;
pub mod store;
