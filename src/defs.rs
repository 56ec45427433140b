//! Definition extraction: aliases, elements and animation patterns
//!
//! Pulls the `elementN` and animation entries that apply to one surface id
//! out of every loaded definition file, applying per-file alias
//! substitution first and merging repeated animation ids across files.

use crate::models::{AnimationDef, ComposeMethod, DisplayPolicy, ElementDef, OffsetMode, PatternDef};
use crate::scope::scope_applies;
use crate::surfaces::SurfacesFile;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Interval keywords that mark an animation as a display-last overlay.
const LAST_ONLY_KEYWORDS: [&str; 6] =
    ["sometimes", "rarely", "random", "periodic", "runonce", "always"];

/// Everything declared for one surface id after cross-file merging.
/// Animations are keyed by id, giving ascending iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceDefs {
    pub elements: Vec<ElementDef>,
    pub animations: BTreeMap<u32, AnimationDef>,
}

impl SurfaceDefs {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.animations.is_empty()
    }
}

fn element_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^element(\d+)$").expect("valid regex"))
}

fn scoped_interval_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^animation(\d+)\.interval$").expect("valid regex"))
}

fn scoped_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^animation(\d+)\.pattern(\d+)$").expect("valid regex"))
}

fn legacy_interval_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)interval$").expect("valid regex"))
}

fn legacy_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)pattern(\d+)$").expect("valid regex"))
}

/// Resolve the surface alias declared by `<character>.surface.alias` in
/// one file. Exactly one substitution; chains are never followed.
pub fn resolve_alias(file: &SurfacesFile, character: &str, id: i64) -> i64 {
    let scope_name = format!("{}.surface.alias", character);
    let key = id.to_string();
    for scope in file.scopes_named(&scope_name) {
        for (entry_key, value) in &scope.entries {
            if entry_key != &key {
                continue;
            }
            let stripped = value.trim().trim_start_matches('[').trim_end_matches(']');
            if let Some(first) = stripped.split(',').next() {
                if let Ok(target) = first.trim().parse::<i64>() {
                    return target;
                }
            }
        }
    }
    id
}

/// Resolve the alias across all files: the first file that declares one
/// wins, otherwise the id is returned unchanged.
pub fn resolve_alias_all(files: &[SurfacesFile], character: &str, id: i64) -> i64 {
    for file in files {
        let target = resolve_alias(file, character, id);
        if target != id {
            return target;
        }
    }
    id
}

/// Gather and merge every element and animation definition that applies
/// to `id` across all definition files belonging to a shell.
///
/// Alias substitution is applied per file before scope matching. When the
/// same animation id appears in more than one file, the more specific
/// non-`None` display policy is kept and the new file's patterns are
/// appended to the existing list.
pub fn collect_definitions(files: &[SurfacesFile], character: &str, id: i64) -> SurfaceDefs {
    let mut defs = SurfaceDefs::default();

    for file in files {
        let file_id = resolve_alias(file, character, id);
        let mut file_anims: BTreeMap<u32, AnimationDef> = BTreeMap::new();

        for scope in &file.scopes {
            if !scope_applies(&scope.name, file_id) {
                continue;
            }
            for (key, value) in &scope.entries {
                if let Some(caps) = element_re().captures(key) {
                    if let Some(element) = parse_element(&caps[1], value) {
                        defs.elements.push(element);
                    }
                } else if let Some(caps) = scoped_interval_re().captures(key) {
                    if let Ok(anim_id) = caps[1].parse::<u32>() {
                        apply_interval(file_anims.entry(anim_id).or_insert_with(|| AnimationDef::new(anim_id)), value);
                    }
                } else if let Some(caps) = scoped_pattern_re().captures(key) {
                    if let (Ok(anim_id), Ok(pat_id)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
                        if let Some(pattern) = parse_scoped_pattern(pat_id, value) {
                            file_anims
                                .entry(anim_id)
                                .or_insert_with(|| AnimationDef::new(anim_id))
                                .patterns
                                .push(pattern);
                        }
                    }
                } else if let Some(caps) = legacy_interval_re().captures(key) {
                    if let Ok(anim_id) = caps[1].parse::<u32>() {
                        apply_interval(file_anims.entry(anim_id).or_insert_with(|| AnimationDef::new(anim_id)), value);
                    }
                } else if let Some(caps) = legacy_pattern_re().captures(key) {
                    if let (Ok(anim_id), Ok(pat_id)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
                        if let Some(pattern) = parse_legacy_pattern(pat_id, value) {
                            file_anims
                                .entry(anim_id)
                                .or_insert_with(|| AnimationDef::new(anim_id))
                                .patterns
                                .push(pattern);
                        }
                    }
                }
                // Unrecognized keys are swallowed at the line level.
            }
        }

        for (anim_id, anim) in file_anims {
            merge_animation(&mut defs.animations, anim_id, anim);
        }
    }

    defs
}

/// Merge one file's animation into the cross-file map: the first non-None
/// display policy sticks, and the incoming file's patterns are appended
/// to the existing list.
fn merge_animation(animations: &mut BTreeMap<u32, AnimationDef>, id: u32, incoming: AnimationDef) {
    match animations.get_mut(&id) {
        Some(existing) => {
            if existing.display == DisplayPolicy::None && incoming.display != DisplayPolicy::None {
                existing.display = incoming.display;
                existing.offsets = incoming.offsets;
                existing.gated = incoming.gated;
            }
            existing.patterns.extend(incoming.patterns);
        }
        None => {
            animations.insert(id, incoming);
        }
    }
}

/// Interval text determines how the animation participates in a static
/// pose. Exactly `bind` shows every pattern with absolute offsets; the
/// periodic keywords show only the last pattern with accumulated offsets.
fn apply_interval(anim: &mut AnimationDef, value: &str) {
    let text = value.trim().to_ascii_lowercase();
    if text == "bind" {
        anim.display = DisplayPolicy::All;
        anim.offsets = OffsetMode::Absolute;
        anim.gated = true;
    } else if LAST_ONLY_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        anim.display = DisplayPolicy::LastOnly;
        anim.offsets = OffsetMode::RelativeFromPrevious;
        anim.gated = text.contains("bind");
    } else {
        anim.display = DisplayPolicy::None;
        anim.gated = false;
    }
}

/// `elementN,method,filename,x,y` — filename lower-cased, `.png` appended
/// when no extension is given.
fn parse_element(id_text: &str, value: &str) -> Option<ElementDef> {
    let id: u32 = id_text.parse().ok()?;
    let mut parts = value.split(',').map(str::trim);
    let method = ComposeMethod::parse(parts.next()?);
    let raw_name = parts.next()?;
    if raw_name.is_empty() {
        return None;
    }
    let mut filename = raw_name.to_lowercase();
    if !filename.contains('.') {
        filename.push_str(".png");
    }
    let x = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    let y = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    Some(ElementDef { id, method, filename, x, y })
}

/// Scoped form: `animationN.patternM,method,surface,wait,x,y`.
fn parse_scoped_pattern(id: u32, value: &str) -> Option<PatternDef> {
    let mut parts = value.split(',').map(str::trim);
    let method = ComposeMethod::parse(parts.next()?);
    let surface: i64 = parts.next()?.parse().ok()?;
    let _wait = parts.next();
    let x = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    let y = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    Some(PatternDef { id, method, surface, x, y })
}

/// Legacy form: `NpatternM,surface,wait,method,x,y`.
fn parse_legacy_pattern(id: u32, value: &str) -> Option<PatternDef> {
    let mut parts = value.split(',').map(str::trim);
    let surface: i64 = parts.next()?.parse().ok()?;
    let _wait = parts.next();
    let method = ComposeMethod::parse(parts.next().unwrap_or("overlay"));
    let x = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    let y = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    Some(PatternDef { id, method, surface, x, y })
}
