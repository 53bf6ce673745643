// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flat sector records produced by sector splitting

use crate::bounds::BoundingBox;
use crate::primitive::Primitive;

/// One streaming sector.
///
/// Sectors reference their parent by id; a missing parent marks a root.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sector {
    pub id: u32,
    pub parent_id: Option<u32>,
    pub depth: u32,
    /// Slash-separated id path from the root, e.g. `"0/3/12"`
    pub path: String,
    pub estimated_triangle_count: u64,
    pub estimated_draw_call_count: u64,
    pub bounds: Option<BoundingBox>,
    pub primitives: Vec<Primitive>,
}

impl Sector {
    /// Empty sector without geometry
    pub fn new(id: u32, parent_id: Option<u32>, depth: u32) -> Self {
        Self {
            id,
            parent_id,
            depth,
            path: String::new(),
            estimated_triangle_count: 0,
            estimated_draw_call_count: 0,
            bounds: None,
            primitives: Vec::new(),
        }
    }

    /// Attach geometry and derive cost estimates and bounds from it.
    ///
    /// Every distinct primitive kind costs one draw call.
    pub fn with_primitives(mut self, primitives: Vec<Primitive>) -> Self {
        self.estimated_triangle_count = primitives
            .iter()
            .map(|p| p.estimated_triangle_count() as u64)
            .sum();
        let mut kinds: Vec<_> = primitives.iter().map(Primitive::kind).collect();
        kinds.sort_by_key(|k| *k as u8);
        kinds.dedup();
        self.estimated_draw_call_count = kinds.len() as u64;
        self.bounds = primitives
            .iter()
            .map(Primitive::bounds)
            .reduce(|a, b| a.union(&b));
        self.primitives = primitives;
        self
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Output of one conversion: the flat sector list
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scene {
    pub sectors: Vec<Sector>,
}

impl Scene {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self { sectors }
    }
}
