//! Shellsurf - resolver and compositor for character shell surfaces
//!
//! This library provides functionality to:
//! - Parse flat and scoped shell description files (legacy code-page aware)
//! - Resolve a surface id into an ordered layer list (aliases, costume
//!   overlays, cycle-safe recursion)
//! - Composite layer lists into RGBA rasters and derive face thumbnails

pub mod bindgroup;
pub mod cli;
pub mod compositor;
pub mod defs;
pub mod descript;
pub mod error;
pub mod face;
pub mod models;
pub mod output;
pub mod resolver;
pub mod scope;
pub mod shell;
pub mod surfaces;
