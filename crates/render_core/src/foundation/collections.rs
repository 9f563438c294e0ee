//! Handle types for slot-map backed storage
//!
//! Every long-lived object (nodes, geometries, materials, compiled programs)
//! lives in a `SlotMap` and is addressed by a typed key. Keys are cheap to
//! copy, totally ordered, and never dangle: a removed slot invalidates its key.

pub use slotmap::{SlotMap, SecondaryMap};

slotmap::new_key_type! {
    /// Handle to a node in the scene graph
    pub struct NodeId;

    /// Handle to a geometry resource
    pub struct GeometryId;

    /// Handle to a material resource
    pub struct MaterialId;

    /// Handle to a compiled program in the program cache
    pub struct ProgramId;
}
