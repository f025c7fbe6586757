//! # Voxel Code Module
//!
//! This module defines the integer codes stored in a semantic voxel grid and their
//! classification.
//!
//! * `0` is void
//! * positive codes are land-cover classes, found only at a column's ground surface cell
//! * negative codes are volumetric fills written by the compositor

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// The underlying integer type of a voxel code.
pub type VoxelCode = i32;

/// Void / air.
pub const VOID: VoxelCode = 0;
/// Everything strictly below a column's ground surface.
pub const UNDERGROUND: VoxelCode = -1;
/// The leafy part of a tree.
pub const TREE_CROWN: VoxelCode = -2;
/// Space occupied by a building segment.
pub const BUILDING: VoxelCode = -3;

/// The volumetric fills the compositor writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum VoxelFill {
    Underground = -1,
    TreeCrown = -2,
    Building = -3,
}

/// Classification of a voxel code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VoxelClass {
    /// Nothing occupies the cell
    Void,
    /// The ground surface cell, carrying a land-cover class
    LandCover(VoxelCode),
    /// A fill written by the compositor
    Fill(VoxelFill),
    /// A negative code outside the compositor's fills, e.g. facade materials or markers
    Other(VoxelCode),
}

impl VoxelClass {
    /// Classifies a raw voxel code.
    pub fn of(code: VoxelCode) -> Self {
        if code == VOID {
            VoxelClass::Void
        } else if code > 0 {
            VoxelClass::LandCover(code)
        } else {
            match VoxelFill::from_i32(code) {
                Some(fill) => VoxelClass::Fill(fill),
                None => VoxelClass::Other(code),
            }
        }
    }

    pub fn is_void(self) -> bool {
        self == VoxelClass::Void
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_codes() {
        assert_eq!(VoxelClass::of(0), VoxelClass::Void);
        assert_eq!(VoxelClass::of(12), VoxelClass::LandCover(12));
        assert_eq!(VoxelClass::of(-1), VoxelClass::Fill(VoxelFill::Underground));
        assert_eq!(VoxelClass::of(-2), VoxelClass::Fill(VoxelFill::TreeCrown));
        assert_eq!(VoxelClass::of(-3), VoxelClass::Fill(VoxelFill::Building));
        assert_eq!(VoxelClass::of(-16), VoxelClass::Other(-16));
    }

    #[test]
    fn fill_discriminants_match_constants() {
        assert_eq!(VoxelFill::Underground as VoxelCode, UNDERGROUND);
        assert_eq!(VoxelFill::TreeCrown as VoxelCode, TREE_CROWN);
        assert_eq!(VoxelFill::Building as VoxelCode, BUILDING);
    }
}
