//! recpost Pipeline
//!
//! Post-processing for device recording runs: stale capture folders are
//! removed, raw videos are transcoded and published, screenshots are copied
//! into the docs site, and the output directory is emptied.
//!
//! # Stage Order
//!
//! ```text
//! output/2025-*  ──────────── Cleanup (remove_dir_all)
//!                                  │
//! output/screenshots/**/*.mp4 ── Transcode (ffmpeg, concurrent) ──► output/<name>.mp4
//!                                  │
//! output/**/*.mp4 ─────────────── Upload (blob store, concurrent; skipped if nothing transcoded)
//!                                  │
//! output/screenshots/**/*.png ── Relocate ──► docs/public/screenshots/**
//!                                  │
//! output/**/*.{mp4,png} ───────── Purge
//! ```
//!
//! Each stage scans once on entry, settles every item, and reports
//! `succeeded/attempted` through a [`report::BatchReport`].

pub mod cleanup;
pub mod orchestrator;
pub mod relocate;
pub mod report;
pub mod scanner;
pub mod store;
pub mod transcode;
pub mod upload;

pub use orchestrator::*;
pub use report::{BatchReport, ItemOutcome, Tally};
