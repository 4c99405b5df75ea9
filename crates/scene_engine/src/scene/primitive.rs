//! Primitive sets describing how geometry vertices are assembled

/// Topology of a primitive set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    /// Independent points
    Points,
    /// Independent line segments
    Lines,
    /// Connected line segments
    LineStrip,
    /// Closed line loop
    LineLoop,
    /// Independent triangles
    Triangles,
    /// Triangle strip with alternating winding
    TriangleStrip,
    /// Triangles sharing the first vertex
    TriangleFan,
}

impl PrimitiveMode {
    /// OpenGL enum value
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Points => 0x0000,
            Self::Lines => 0x0001,
            Self::LineLoop => 0x0002,
            Self::LineStrip => 0x0003,
            Self::Triangles => 0x0004,
            Self::TriangleStrip => 0x0005,
            Self::TriangleFan => 0x0006,
        }
    }

    /// Whether the mode produces triangles
    pub const fn is_triangles(self) -> bool {
        matches!(self, Self::Triangles | Self::TriangleStrip | Self::TriangleFan)
    }
}

/// A draw call over a geometry's vertices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveSet {
    /// Consecutive vertices starting at `first`
    DrawArrays {
        /// Topology
        mode: PrimitiveMode,
        /// First vertex
        first: u32,
        /// Number of vertices
        count: u32,
    },
    /// Vertices addressed through an index buffer
    DrawElements {
        /// Topology
        mode: PrimitiveMode,
        /// Index buffer
        indices: Vec<u32>,
        /// First index used
        offset: usize,
        /// Number of indices used
        count: usize,
    },
}

impl PrimitiveSet {
    /// Non-indexed draw
    pub fn draw_arrays(mode: PrimitiveMode, first: u32, count: u32) -> Self {
        Self::DrawArrays { mode, first, count }
    }

    /// Indexed draw over the whole index buffer
    pub fn draw_elements(mode: PrimitiveMode, indices: Vec<u32>) -> Self {
        let count = indices.len();
        Self::DrawElements {
            mode,
            indices,
            offset: 0,
            count,
        }
    }

    /// Indexed draw over a range of the index buffer
    pub fn draw_elements_range(mode: PrimitiveMode, indices: Vec<u32>, offset: usize, count: usize) -> Self {
        Self::DrawElements {
            mode,
            indices,
            offset,
            count,
        }
    }

    /// Topology
    pub fn mode(&self) -> PrimitiveMode {
        match self {
            Self::DrawArrays { mode, .. } | Self::DrawElements { mode, .. } => *mode,
        }
    }

    /// Number of vertices or indices drawn
    pub fn count(&self) -> usize {
        match self {
            Self::DrawArrays { count, .. } => *count as usize,
            Self::DrawElements { count, .. } => *count,
        }
    }

    /// Whether the draw reads an index buffer
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::DrawElements { .. })
    }

    /// Largest vertex index the draw touches
    pub fn max_vertex_index(&self) -> Option<u32> {
        match self {
            Self::DrawArrays { first, count, .. } => count.checked_sub(1).map(|last| first + last),
            Self::DrawElements {
                indices,
                offset,
                count,
                ..
            } => indices.iter().skip(*offset).take(*count).copied().max(),
        }
    }
}
