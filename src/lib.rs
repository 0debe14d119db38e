// src/lib.rs

//! Estate Crawler Library
//!
//! Scrapes immobiliare.it listing pages into validated records and upserts
//! them into a pluggable storage backend.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
