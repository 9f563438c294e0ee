//! # Render Core
//!
//! A retained-mode scene graph and the pipeline that turns it into a short,
//! correctly ordered stream of GPU calls every frame.
//!
//! ## Features
//!
//! - **Scene graph**: slot-map backed node hierarchy with dirty-flag world
//!   transform propagation that skips clean subtrees
//! - **Render lists**: frustum culling, opaque/transmissive/transparent
//!   buckets, stable painter's sorting
//! - **Program cache**: shader programs keyed by material features, lights
//!   and environment; reference counted, compiled once per key
//! - **State binder**: mirrored GPU state so redundant calls never reach the
//!   device
//! - **Picking**: ray queries against bounding spheres or triangles
//!
//! ## Quick Start
//!
//! ```rust
//! use render_core::prelude::*;
//!
//! let mut graph = SceneGraph::new();
//! let root = graph.add_node(Node::group("root"));
//!
//! let mut resources = ResourceRegistry::new();
//! let geometry = resources.add_geometry(Geometry::cuboid(1.0, 1.0, 1.0));
//! let material = resources.add_material(Material::basic(Vec3::new(1.0, 0.5, 0.2)));
//! graph
//!     .add_node_under(root, Node::mesh("box", RenderObject::new(geometry, material)))
//!     .unwrap();
//!
//! let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
//! let mut renderer = FrameRenderer::new(RecordingDevice::new(), RendererConfig::default()).unwrap();
//! let stats = renderer.render_frame(&mut graph, root, &resources, &camera).unwrap();
//! assert_eq!(stats.draws, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for users of the renderer
pub mod prelude {
    pub use crate::{
        config::{Config, RendererConfig},
        foundation::{
            collections::{GeometryId, MaterialId, NodeId},
            math::{Mat4, Quat, Transform, Vec3},
        },
        render::{
            Camera, FrameRenderer, FrameStats, Geometry, GraphicsDevice, Light, MapSlot, Material,
            RecordingDevice, RenderError, ResourceRegistry, ShadingModel,
        },
        scene::{pick, Node, NodeKind, PickHit, PickMode, RenderObject, SceneError, SceneGraph},
    };
}
