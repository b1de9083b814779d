//! Core of the nutrilog protein/fiber tracker.
//!
//! Daily records live in a [`store::KeyValueStore`] under
//! `nutrition-<YYYY-MM-DD>` keys. [`journal::Journal`] reads and writes them,
//! [`report`] derives the weekly and all-time views, and [`tracker::Tracker`]
//! holds the state a front end works against.

pub mod db;
pub mod error;
pub mod journal;
pub mod models;
pub mod report;
pub mod store;
pub mod tracker;
pub mod usda;
