//! Skybox cube face identification and enumeration.

use serde::{Deserialize, Serialize};

/// Identifies one of the six skybox faces.
///
/// Discriminants follow the order faces are emitted in, which is also the
/// order of the lines in the skybox material file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CubeFaceId {
    /// +Z face
    PosZ = 0,
    /// -Z face
    NegZ = 1,
    /// +X face
    PosX = 2,
    /// -X face
    NegX = 3,
    /// +Y face
    PosY = 4,
    /// -Y face
    NegY = 5,
}

impl CubeFaceId {
    /// Returns all six faces in emission order.
    pub const fn all() -> [CubeFaceId; 6] {
        [
            CubeFaceId::PosZ,
            CubeFaceId::NegZ,
            CubeFaceId::PosX,
            CubeFaceId::NegX,
            CubeFaceId::PosY,
            CubeFaceId::NegY,
        ]
    }

    /// Returns the face index (0-5).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Creates a face from an index (0-5).
    pub const fn from_index(index: usize) -> Option<CubeFaceId> {
        match index {
            0 => Some(CubeFaceId::PosZ),
            1 => Some(CubeFaceId::NegZ),
            2 => Some(CubeFaceId::PosX),
            3 => Some(CubeFaceId::NegX),
            4 => Some(CubeFaceId::PosY),
            5 => Some(CubeFaceId::NegY),
            _ => None,
        }
    }

    /// Key used in face file names and material lines (e.g. "pz", "ny").
    pub const fn key(self) -> &'static str {
        match self {
            CubeFaceId::PosZ => "pz",
            CubeFaceId::NegZ => "nz",
            CubeFaceId::PosX => "px",
            CubeFaceId::NegX => "nx",
            CubeFaceId::PosY => "py",
            CubeFaceId::NegY => "ny",
        }
    }

    /// `(column, row)` of the face in the 4x3 cross preview.
    pub const fn cross_cell(self) -> (u32, u32) {
        match self {
            CubeFaceId::NegX => (0, 1),
            CubeFaceId::PosZ => (1, 1),
            CubeFaceId::PosX => (2, 1),
            CubeFaceId::NegZ => (3, 1),
            CubeFaceId::PosY => (1, 0),
            CubeFaceId::NegY => (1, 2),
        }
    }
}
