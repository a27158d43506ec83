//! Activity logging: typed domain events written as append-only JSONL.

pub mod activity;
pub mod jsonl;
