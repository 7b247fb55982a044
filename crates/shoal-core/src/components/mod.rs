//! Component definitions for the ECS world.
//!
//! Components are pure data attached to entities. Stock pools
//! (`BiomassPool`, `AbundancePool`) are components too; they come from
//! `shoal_logic` and carry no behavior here.

mod map;

pub use map::*;
