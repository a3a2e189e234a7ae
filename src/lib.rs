pub mod cluster;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod incremental;
pub mod kv;
pub mod metadata;
pub mod models;
pub mod queue;
pub mod reconcile;
pub mod repair;
pub mod storage;
pub mod thumbnails;
pub mod worker;
