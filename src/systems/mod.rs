//! Engine systems.
//!
//! Stateless passes that work over entities and scenes.
//!
//! Submodules overview
//! - [`collision`] – entity-vs-entity and probe queries with the entity rules
//! - [`render`] – the [`Canvas`](render::Canvas) drawing seam and debug overlays

pub mod collision;
pub mod render;
