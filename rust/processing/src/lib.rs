// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Processing pipeline shared by the Reveal-Lite converters.
//!
//! Turns the proto primitives produced by format providers into exportable
//! primitives with shared template meshes, and analyzes the sector lists
//! produced by sector splitting.

pub mod config;
pub mod error;
pub mod ids;
pub mod instancing;
pub mod sector_tree;

pub use config::InstancingConfig;
pub use error::{Error, Result};
pub use ids::IdGenerator;
pub use instancing::{
    run_instancing, InstancingOutput, InstancingStatistics, ProtoFacetGroup, ProtoPrimitive,
    TemplateMesh,
};
pub use sector_tree::{
    analyze_sectors_in_scene, calculate_minimum_cost_for_leafs, generate_sector_tree, LeafCost,
    SectorAnalysisResult, SectorTreeNode,
};
