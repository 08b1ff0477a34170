//! Long-lived data owned by scenes and entities.
//!
//! Overview
//! - `deferred` – the Open/Locked/Error change queue shared by the lists
//! - `entitylist` – per-scene entity storage, deferred adds and depth order
//! - `gameconfig` – INI-backed settings and the scene-facing subset
//! - `taglist` – per-tag entity buckets kept in depth order
//! - `tracker` – type-indexed entity and component buckets
//! - `worldtime` – simulation time and delta
pub mod deferred;
pub mod entitylist;
pub mod gameconfig;
pub mod taglist;
pub mod tracker;
pub mod worldtime;
