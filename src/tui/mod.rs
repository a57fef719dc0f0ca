//! Interactive context picker.
//!
//! Drills tenancies → compartments → sub-compartments plus a region picker,
//! fetching lazily in the background. Nothing is persisted until commit.
//!
//! ## Architecture (TEA)
//!
//! Model (`NavState`) + Update (`NavState::update`, returning an optional
//! `Effect`) + View (`layout::draw`). `Session` runs effects out of band
//! and feeds their completions back as ordinary messages.

pub mod app;
pub mod cache;
pub mod event;
pub mod fetch;
pub mod input;
pub mod layout;
pub mod list;
pub mod names;
pub mod prompt;
pub mod rows;
pub mod runner;
pub mod session;
