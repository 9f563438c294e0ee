//! Scene management
//!
//! The scene graph owns the node hierarchy and keeps world matrices current.
//! Per frame the render-list builder turns the visible part of the graph
//! into sorted draw entries; picking answers ray queries against the same
//! graph without touching the draw pipeline.
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (nodes, transforms)
//!      ↓
//! RenderLists (cull, bucket, sort)
//!      ↓
//! FrameRenderer (programs, state, draws)
//! ```

mod bounds;
mod error;
mod node;
mod picking;
mod render_list;
mod render_object;
mod scene_graph;

pub use bounds::{world_center, BoundingSphere, Frustum, Plane, Ray, AABB};
pub use error::{SceneError, SceneResult};
pub use node::{Node, NodeKind};
pub use picking::{pick, raycast, PickHit, PickMode};
pub use render_list::{
    painter_order, reverse_painter_order, BuildStats, RenderBucket, RenderListEntry, RenderLists, SortFn,
};
pub use render_object::RenderObject;
pub use scene_graph::SceneGraph;
