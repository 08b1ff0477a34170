//! Cinder2D engine core.
//!
//! The runtime heart of a small 2D game engine: entities with components
//! and colliders, scenes that run them in depth order, geometric collision
//! between every pair of collider shapes, type-indexed tracking, and
//! coroutine and state machine components for gameplay logic.
//!
//! Nothing here opens a window. Drawing goes through the
//! [`Canvas`](systems::render::Canvas) trait so any backend can plug in.

pub mod colliders;
pub mod components;
pub mod entity;
pub mod error;
pub mod math;
pub mod resources;
pub mod sandbox;
pub mod scene;
pub mod systems;
