//! Per-frame statistics

/// Uniform block uploads by block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformUploads {
    /// Camera blocks
    pub camera: usize,
    /// Per-object blocks
    pub object: usize,
    /// Material blocks
    pub material: usize,
    /// Light blocks
    pub lights: usize,
}

/// What one `render_frame` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number (starts at 1)
    pub frame: u64,
    /// World matrices rebuilt
    pub transforms_updated: usize,
    /// Objects rejected by frustum culling
    pub culled: usize,
    /// Opaque entries
    pub opaque: usize,
    /// Transmissive entries
    pub transmissive: usize,
    /// Transparent entries
    pub transparent: usize,
    /// Draw calls issued (including the transmission pre-pass)
    pub draws: usize,
    /// Draws skipped: program failed to compile
    pub skipped_compile: usize,
    /// Draws skipped: geometry lacks a required attribute
    pub skipped_missing_attribute: usize,
    /// Draws skipped: program still compiling
    pub skipped_not_ready: usize,
    /// Draws skipped: program or texture-unit budget reached
    pub skipped_resource: usize,
    /// Draws skipped: stale material or geometry handle
    pub skipped_missing_resource: usize,
    /// Program binds issued
    pub program_switches: usize,
    /// State-change calls issued
    pub state_changes: u64,
    /// State-change calls elided by the mirror
    pub state_changes_elided: u64,
    /// Uniform uploads
    pub uploads: UniformUploads,
    /// Vertex and index buffers uploaded
    pub buffer_uploads: usize,
    /// The transmission pre-pass ran
    pub transmission_pass: bool,
    /// The frame stopped early
    pub cancelled: bool,
}

impl FrameStats {
    /// Total draws skipped for any reason
    pub fn skipped(&self) -> usize {
        self.skipped_compile
            + self.skipped_missing_attribute
            + self.skipped_not_ready
            + self.skipped_resource
            + self.skipped_missing_resource
    }
}
