//! Shell loading and per-side rendering
//!
//! A `Shell` is built once from a directory (description table plus all
//! `surfaces*.txt` definition files) and is read-only afterward; reload
//! means constructing a new one. Variant behavior plugs in through
//! strategy objects rather than subclassing: extra definition sources
//! and a face-crop override.

use crate::bindgroup::enabled_groups;
use crate::compositor::{composite, CompositeOptions};
use crate::descript::DescriptTable;
use crate::error::{ErrorKind, ShellError};
use crate::face::{face_thumbnail, FaceRect};
use crate::models::{Side, SurfaceModel};
use crate::resolver::{resolve_surface, ResolveContext};
use crate::surfaces::SurfacesFile;
use image::RgbaImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Supplies definition files beyond the shell directory's own
/// `surfaces*.txt` set (shell variants, test harnesses).
pub trait DescriptSource {
    fn load(&self, root: &Path) -> std::io::Result<Option<SurfacesFile>>;
}

/// Overrides where a side's face is cropped from, taking precedence over
/// the `<side>.face.*` description entries.
pub trait FaceCropOverride {
    fn rect(&self, side: Side) -> Result<Option<FaceRect>, ErrorKind>;
}

/// Knobs for `Shell::load_with`.
#[derive(Default)]
pub struct ShellOptions {
    /// Persisted costume-selection store (`charN.bind.savearray` lines).
    pub profile: Option<PathBuf>,
    pub extra_sources: Vec<Box<dyn DescriptSource>>,
    pub face_crop: Option<Box<dyn FaceCropOverride>>,
}

/// A loaded shell: everything resolution and rendering read from.
pub struct Shell {
    root: PathBuf,
    descript: DescriptTable,
    surfaces: Vec<SurfacesFile>,
    profile: Option<DescriptTable>,
    face_crop: Option<Box<dyn FaceCropOverride>>,
}

impl Shell {
    pub fn load(dir: &Path) -> Result<Shell, ShellError> {
        Self::load_with(dir, ShellOptions::default())
    }

    pub fn load_with(dir: &Path, options: ShellOptions) -> Result<Shell, ShellError> {
        let descript_path = dir.join("descript.txt");
        let descript = if descript_path.exists() {
            DescriptTable::load(&descript_path).map_err(ErrorKind::Io)?
        } else {
            DescriptTable::from_bytes(&[], None)
        };

        let mut surfaces = Vec::new();
        for path in surface_files(dir).map_err(ErrorKind::Io)? {
            surfaces.push(SurfacesFile::load(&path).map_err(ErrorKind::Io)?);
        }
        for source in &options.extra_sources {
            if let Some(file) = source.load(dir).map_err(ErrorKind::Io)? {
                surfaces.push(file);
            }
        }

        let profile = match &options.profile {
            Some(path) => Some(DescriptTable::load(path).map_err(ErrorKind::Io)?),
            None => None,
        };

        Ok(Shell {
            root: dir.to_path_buf(),
            descript,
            surfaces,
            profile,
            face_crop: options.face_crop,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn descript(&self) -> &DescriptTable {
        &self.descript
    }

    /// The active costume-group set for one side.
    pub fn enabled_groups(&self, side: Side) -> HashSet<u32> {
        enabled_groups(&self.descript, self.profile.as_ref(), side)
    }

    /// Resolve a surface id into its ordered layer list.
    pub fn resolve(&self, side: Side, surface_id: i64) -> Result<SurfaceModel, ShellError> {
        let enabled = self.enabled_groups(side);
        let ctx = ResolveContext {
            root: &self.root,
            files: &self.surfaces,
            side,
            enabled: &enabled,
        };
        resolve_surface(&ctx, surface_id).map_err(|kind| kind.on_side(side))
    }

    /// Resolve and composite one side's surface.
    pub fn render_surface(
        &self,
        side: Side,
        surface_id: i64,
        trim: bool,
    ) -> Result<RgbaImage, ShellError> {
        let model = self.resolve(side, surface_id)?;
        let opts = CompositeOptions { use_self_alpha: self.use_self_alpha(), trim };
        composite(&model.layers, &opts).map_err(|kind| kind.on_side(side))
    }

    /// Render both character sides independently. A failure on one side
    /// never blocks the other; each result carries its own side tag.
    pub fn render_both(
        &self,
        sakura_id: i64,
        kero_id: i64,
        trim: bool,
    ) -> (Result<RgbaImage, ShellError>, Result<RgbaImage, ShellError>) {
        (
            self.render_surface(Side::Sakura, sakura_id, trim),
            self.render_surface(Side::Kero, kero_id, trim),
        )
    }

    /// Derive a side's face thumbnail: render with trimming disabled,
    /// then crop/scale/pad into the target box.
    pub fn face_thumbnail(
        &self,
        side: Side,
        surface_id: i64,
        target_w: u32,
        target_h: u32,
    ) -> Result<RgbaImage, ShellError> {
        let rendered = self.render_surface(side, surface_id, false)?;
        let rect = self.face_rect(side).map_err(|kind| kind.on_side(side))?;
        face_thumbnail(rendered, rect, target_w, target_h).map_err(|kind| kind.on_side(side))
    }

    /// The explicit face-crop rectangle for a side, if any: the override
    /// strategy wins, otherwise the `<side>.face.*` description entries.
    pub fn face_rect(&self, side: Side) -> Result<Option<FaceRect>, ErrorKind> {
        if let Some(strategy) = &self.face_crop {
            if let Some(rect) = strategy.rect(side)? {
                return Ok(Some(rect));
            }
        }
        FaceRect::from_parts(
            self.face_part(side, "left")?,
            self.face_part(side, "top")?,
            self.face_part(side, "width")?,
            self.face_part(side, "height")?,
        )
    }

    fn face_part(&self, side: Side, part: &str) -> Result<Option<i64>, ErrorKind> {
        match self.descript.get(&format!("{}.face.{}", side.name(), part)) {
            None => Ok(None),
            Some(text) => text.trim().parse::<i64>().map(Some).map_err(|_| {
                ErrorKind::InvalidInput(format!(
                    "{}.face.{} is not a number: '{}'",
                    side.name(),
                    part,
                    text
                ))
            }),
        }
    }

    fn use_self_alpha(&self) -> bool {
        self.descript.get_flag("seriko.use_self_alpha")
    }
}

/// `surfaces*.txt` files under the shell root: `surfaces.txt` itself
/// first, the rest in lexicographic order.
fn surface_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let pattern = dir.join("surfaces*.txt");
    let pattern = pattern.to_string_lossy();
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?
        .filter_map(Result::ok)
        .collect();
    paths.sort_by_key(|p| {
        let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        (name != "surfaces.txt", name)
    });
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([200, 30, 30, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    fn basic_shell(dir: &Path) {
        std::fs::write(dir.join("descript.txt"), "charset,UTF-8\nname,test shell\n").unwrap();
        std::fs::write(
            dir.join("surfaces.txt"),
            "surface0\n{\nelement0,base,body.png,0,0\n}\nsurface10\n{\nelement0,base,kero.png,0,0\n}\n",
        )
        .unwrap();
        write_png(dir, "body.png", 8, 8);
        write_png(dir, "kero.png", 4, 4);
    }

    #[test]
    fn test_load_and_render_both_sides() {
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        let shell = Shell::load(dir.path()).unwrap();
        let (sakura, kero) = shell.render_both(0, 10, false);
        assert_eq!(sakura.unwrap().dimensions(), (8, 8));
        assert_eq!(kero.unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_side_failure_does_not_block_other_side() {
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        let shell = Shell::load(dir.path()).unwrap();
        // Surface 99 has no definitions; surface 0 still renders.
        let (sakura, kero) = shell.render_both(0, 99, false);
        assert!(sakura.is_ok());
        let err = kero.unwrap_err();
        assert_eq!(err.side, Some(Side::Kero));
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_surface_files_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("surfaces2.txt"), "").unwrap();
        std::fs::write(dir.path().join("surfaces.txt"), "").unwrap();
        std::fs::write(dir.path().join("surfaces10.txt"), "").unwrap();
        let files = surface_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["surfaces.txt", "surfaces10.txt", "surfaces2.txt"]);
    }

    #[test]
    fn test_extra_definition_source() {
        struct Extra;
        impl DescriptSource for Extra {
            fn load(&self, _root: &Path) -> std::io::Result<Option<SurfacesFile>> {
                Ok(Some(SurfacesFile::from_bytes(
                    b"surface42\n{\nelement0,base,extra.png,0,0\n}\n",
                    None,
                )))
            }
        }
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        write_png(dir.path(), "extra.png", 2, 2);
        let options = ShellOptions { extra_sources: vec![Box::new(Extra)], ..Default::default() };
        let shell = Shell::load_with(dir.path(), options).unwrap();
        let img = shell.render_surface(Side::Sakura, 42, false).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
    }

    #[test]
    fn test_face_rect_from_descript() {
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        std::fs::write(
            dir.path().join("descript.txt"),
            "sakura.face.left,1\nsakura.face.top,2\nsakura.face.width,3\nsakura.face.height,4\n",
        )
        .unwrap();
        let shell = Shell::load(dir.path()).unwrap();
        let rect = shell.face_rect(Side::Sakura).unwrap().unwrap();
        assert_eq!((rect.left, rect.top, rect.width, rect.height), (1, 2, 3, 4));
        assert!(shell.face_rect(Side::Kero).unwrap().is_none());
    }

    #[test]
    fn test_face_rect_partial_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        std::fs::write(dir.path().join("descript.txt"), "sakura.face.left,1\n").unwrap();
        let shell = Shell::load(dir.path()).unwrap();
        assert!(matches!(
            shell.face_rect(Side::Sakura),
            Err(ErrorKind::InvalidInput(_))
        ));
    }

    #[test]
    fn test_face_crop_override_wins() {
        struct Fixed;
        impl FaceCropOverride for Fixed {
            fn rect(&self, _side: Side) -> Result<Option<FaceRect>, ErrorKind> {
                Ok(Some(FaceRect { left: 0, top: 0, width: 4, height: 4 }))
            }
        }
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        let options = ShellOptions { face_crop: Some(Box::new(Fixed)), ..Default::default() };
        let shell = Shell::load_with(dir.path(), options).unwrap();
        let rect = shell.face_rect(Side::Sakura).unwrap().unwrap();
        assert_eq!(rect.width, 4);
    }

    #[test]
    fn test_face_thumbnail_end_to_end() {
        let dir = TempDir::new().unwrap();
        basic_shell(dir.path());
        let shell = Shell::load(dir.path()).unwrap();
        let face = shell.face_thumbnail(Side::Sakura, 0, 16, 16).unwrap();
        assert_eq!(face.dimensions(), (16, 16));
    }

    #[test]
    fn test_profile_savearray_drives_gated_overlays() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("descript.txt"),
            "sakura.bindgroup1.default,0\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("surfaces.txt"),
            concat!(
                "surface0\n{\n",
                "element0,base,body.png,0,0\n",
                "animation1.interval,bind\n",
                "animation1.pattern0,overlay,100,0,0,0\n",
                "}\n",
                "surface100\n{\nelement0,overlay,hat.png,0,0\n}\n"
            ),
        )
        .unwrap();
        write_png(dir.path(), "body.png", 8, 8);
        write_png(dir.path(), "hat.png", 8, 8);
        let profile_path = dir.path().join("profile.txt");
        std::fs::write(&profile_path, "char0.bind.savearray,1=1\n").unwrap();

        let plain = Shell::load(dir.path()).unwrap();
        assert_eq!(plain.resolve(Side::Sakura, 0).unwrap().layers.len(), 1);

        let options = ShellOptions { profile: Some(profile_path), ..Default::default() };
        let dressed = Shell::load_with(dir.path(), options).unwrap();
        assert_eq!(dressed.resolve(Side::Sakura, 0).unwrap().layers.len(), 2);
    }
}
