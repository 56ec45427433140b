//! Data models for shell surface resolution (elements, animations, layers)

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Character side within a shell. Resolution and rendering run
/// independently per side; errors carry the side that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Sakura,
    Kero,
}

impl Side {
    /// Scope/key prefix used in description files.
    pub fn name(&self) -> &'static str {
        match self {
            Side::Sakura => "sakura",
            Side::Kero => "kero",
        }
    }

    /// Numeric tag used when reporting per-side failures (0 = primary).
    pub fn index(&self) -> u8 {
        match self {
            Side::Sakura => 0,
            Side::Kero => 1,
        }
    }

    /// Key prefix used by the persisted costume-selection store.
    pub fn profile_name(&self) -> &'static str {
        match self {
            Side::Sakura => "char0",
            Side::Kero => "char1",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a layer is blended onto the canvas.
///
/// Only `Base`, `Overlay`/`OverlayFast`, `Reduce` and `Interpolate` have
/// distinct semantics; the remaining methods composite as `Overlay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComposeMethod {
    Base,
    Overlay,
    OverlayFast,
    Replace,
    Interpolate,
    Asis,
    Bind,
    Add,
    Reduce,
    Insert,
}

impl ComposeMethod {
    /// Parse a method keyword from a definition file. Unknown keywords
    /// fall back to `Overlay`, matching the lenient line-level parsing
    /// everywhere else in the format.
    pub fn parse(text: &str) -> ComposeMethod {
        match text.trim().to_ascii_lowercase().as_str() {
            "base" => ComposeMethod::Base,
            "overlay" => ComposeMethod::Overlay,
            "overlayfast" => ComposeMethod::OverlayFast,
            "replace" => ComposeMethod::Replace,
            "interpolate" => ComposeMethod::Interpolate,
            "asis" => ComposeMethod::Asis,
            "bind" => ComposeMethod::Bind,
            "add" => ComposeMethod::Add,
            "reduce" => ComposeMethod::Reduce,
            "insert" => ComposeMethod::Insert,
            _ => ComposeMethod::Overlay,
        }
    }
}

/// Which patterns of an animation contribute to a static pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayPolicy {
    /// Excluded from static rendering.
    None,
    /// Only the highest-id pattern is drawn.
    LastOnly,
    /// Every pattern is drawn in pattern-id order.
    All,
}

/// How a pattern's offset combines with the previous pattern's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OffsetMode {
    /// Each pattern's offset stands on its own.
    Absolute,
    /// Offsets accumulate across the walked pattern subset.
    RelativeFromPrevious,
}

/// A static image layer declared with `elementN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementDef {
    pub id: u32,
    pub method: ComposeMethod,
    pub filename: String,
    pub x: i32,
    pub y: i32,
}

/// One frame of an animation. A negative surface id means the frame is
/// explicitly hidden.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternDef {
    pub id: u32,
    pub method: ComposeMethod,
    pub surface: i64,
    pub x: i32,
    pub y: i32,
}

/// An animation declared with `animationN.*` (or the legacy `N*` form).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationDef {
    pub id: u32,
    pub patterns: Vec<PatternDef>,
    pub display: DisplayPolicy,
    pub offsets: OffsetMode,
    /// Gated animations only render when their id is in the enabled
    /// costume-group set.
    pub gated: bool,
}

impl AnimationDef {
    pub fn new(id: u32) -> Self {
        AnimationDef {
            id,
            patterns: Vec::new(),
            display: DisplayPolicy::None,
            offsets: OffsetMode::Absolute,
            gated: false,
        }
    }
}

/// A togglable costume/accessory overlay group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindGroup {
    pub id: u32,
    pub default_enabled: bool,
    /// Groups additionally enabled when this one is (single pass, not
    /// chased to a fixpoint).
    pub add_ids: Vec<u32>,
}

/// One resolved layer: an image file plus how and where to draw it.
/// Offsets are relative to the owning surface's origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub path: PathBuf,
    pub method: ComposeMethod,
    pub x: i32,
    pub y: i32,
}

/// A fully resolved surface: an ordered, bottom-to-top layer list.
/// The order is exactly the order layers were appended during resolution
/// and is load-bearing for compositing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceModel {
    pub surface_id: i64,
    pub layers: Vec<Layer>,
}

impl SurfaceModel {
    pub fn new(surface_id: i64) -> Self {
        SurfaceModel { surface_id, layers: Vec::new() }
    }
}
