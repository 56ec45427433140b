//! Recursive surface resolution into an ordered layer list
//!
//! Turns (surface id, character side, active costume groups) into a
//! bottom-to-top `SurfaceModel`. Costume overlays recurse into their
//! target surfaces; a visited-id set guards against self-referential
//! pattern graphs, so resolution always terminates.

use crate::defs::{collect_definitions, resolve_alias_all};
use crate::error::ErrorKind;
use crate::models::{ComposeMethod, DisplayPolicy, Layer, OffsetMode, Side, SurfaceModel};
use crate::surfaces::SurfacesFile;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Base-image extensions probed in order when a surface has no elements.
/// The `d*p` entries are an encrypted family this crate refuses to read.
const BASE_EXTENSIONS: [&str; 6] = ["png", "bmp", "gif", "jpg", "dgp", "ddp"];

/// Everything resolution needs to look at; nothing here is mutated, so
/// independent resolutions over the same shell are pure functions of
/// their inputs.
pub struct ResolveContext<'a> {
    pub root: &'a Path,
    pub files: &'a [SurfacesFile],
    pub side: Side,
    pub enabled: &'a HashSet<u32>,
}

/// Resolve a top-level surface. Fails when the resulting layer list is
/// empty: with `Unsupported` when no definitions exist for the id at
/// all, otherwise with `MissingAsset` (definitions exist but their files
/// are absent, a fixable content problem).
pub fn resolve_surface(ctx: &ResolveContext, surface_id: i64) -> Result<SurfaceModel, ErrorKind> {
    let mut visited = HashSet::new();
    match resolve(ctx, surface_id, &mut visited, ComposeMethod::Base, 0)? {
        Some(model) => Ok(model),
        None => Err(ErrorKind::Unsupported(format!(
            "surface {} is explicitly hidden and cannot be rendered on its own",
            surface_id
        ))),
    }
}

/// One step of the recursive resolution.
///
/// `inherited` is the composing method of the pattern that led here; it
/// is only used for the sole base-image fallback layer. `visited` is
/// owned by the resolution chain and carries the cycle guard.
pub fn resolve(
    ctx: &ResolveContext,
    surface_id: i64,
    visited: &mut HashSet<i64>,
    inherited: ComposeMethod,
    depth: u32,
) -> Result<Option<SurfaceModel>, ErrorKind> {
    // Explicit hide.
    if surface_id == -1 {
        return Ok(None);
    }

    let resolved = resolve_alias_all(ctx.files, ctx.side.name(), surface_id);
    // `collect_definitions` performs its own per-file alias substitution;
    // handing it the already-substituted id would chain a second hop.
    let defs = collect_definitions(ctx.files, ctx.side.name(), surface_id);

    let mut model = SurfaceModel::new(resolved);

    // Base layer(s): declared elements, or a numeric-suffix image file.
    if !defs.elements.is_empty() {
        for element in &defs.elements {
            let path = ctx.root.join(&element.filename);
            if path.exists() {
                model.layers.push(Layer {
                    path,
                    method: element.method,
                    x: element.x,
                    y: element.y,
                });
            }
        }
    } else if let Some(path) = locate_base_file(ctx.root, resolved)? {
        model.layers.push(Layer { path, method: inherited, x: 0, y: 0 });
    }

    // Overlay layers: animations in ascending id order.
    for anim in defs.animations.values() {
        if anim.display == DisplayPolicy::None {
            continue;
        }
        if anim.gated && !ctx.enabled.contains(&anim.id) {
            continue;
        }

        let mut patterns = anim.patterns.clone();
        patterns.sort_by_key(|p| p.id);
        // display == None was filtered above, so anything else shows
        // either the whole subset or just the final pattern.
        let subset: &[_] = if anim.display == DisplayPolicy::All {
            &patterns
        } else {
            &patterns[patterns.len().saturating_sub(1)..]
        };

        let mut cx = 0;
        let mut cy = 0;
        for pattern in subset {
            match anim.offsets {
                OffsetMode::RelativeFromPrevious => {
                    cx += pattern.x;
                    cy += pattern.y;
                }
                OffsetMode::Absolute => {
                    cx = pattern.x;
                    cy = pattern.y;
                }
            }

            if pattern.surface < 0 {
                continue;
            }

            if pattern.surface == resolved {
                // Self-referential pattern: take the id's own base image
                // directly instead of recursing.
                if let Some(path) = locate_base_file(ctx.root, resolved)? {
                    model.layers.push(Layer { path, method: pattern.method, x: cx, y: cy });
                }
                continue;
            }

            if visited.contains(&pattern.surface) {
                continue;
            }
            visited.insert(resolved);

            if let Some(child) =
                resolve(ctx, pattern.surface, visited, pattern.method, depth + 1)?
            {
                for layer in child.layers {
                    model.layers.push(Layer {
                        path: layer.path,
                        method: layer.method,
                        x: layer.x + cx,
                        y: layer.y + cy,
                    });
                }
            }
        }
    }

    if depth == 0 && model.layers.is_empty() {
        return Err(if defs.is_empty() {
            ErrorKind::Unsupported(format!(
                "surface {} not found: no definitions exist for it",
                surface_id
            ))
        } else {
            ErrorKind::MissingAsset(format!(
                "surface {} not found: definitions exist but no image file is present",
                surface_id
            ))
        });
    }

    Ok(Some(model))
}

/// Locate `surface<id>.<ext>` under the shell root, probing the accepted
/// extension list in order. A file with an encrypted `d*p` extension is
/// an explicit `Unsupported` error, never a silent absence.
pub fn locate_base_file(root: &Path, id: i64) -> Result<Option<PathBuf>, ErrorKind> {
    for ext in BASE_EXTENSIONS {
        let path = root.join(format!("surface{}.{}", id, ext));
        if path.exists() {
            if is_encrypted_extension(ext) {
                return Err(ErrorKind::Unsupported(format!(
                    "surface{}.{} uses an encrypted image format",
                    id, ext
                )));
            }
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn is_encrypted_extension(ext: &str) -> bool {
    let bytes = ext.as_bytes();
    bytes.len() == 3 && bytes[0] == b'd' && bytes[2] == b'p'
}
