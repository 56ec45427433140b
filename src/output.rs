//! PNG output and file path generation

use crate::error::ErrorKind;
use crate::models::Side;
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Save an RGBA image to a PNG file, creating parent directories as
/// needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), ErrorKind> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save(path)?;
    Ok(())
}

/// Default output path for a rendered surface.
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o` | `{shell_dir_name}_s{id}_{side}.png` in the working dir |
/// | `-o file.png` | `file.png` |
/// | `-o dir/` | `dir/{shell_dir_name}_s{id}_{side}.png` |
pub fn surface_output_path(
    shell_dir: &Path,
    surface_id: i64,
    side: Side,
    output_arg: Option<&Path>,
) -> PathBuf {
    let default_name = format!(
        "{}_s{}_{}.png",
        shell_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shell".to_string()),
        surface_id,
        side
    );
    match output_arg {
        None => PathBuf::from(default_name),
        Some(path) => {
            let is_dir = path.is_dir() || path.to_string_lossy().ends_with('/');
            if is_dir {
                path.join(default_name)
            } else {
                path.to_path_buf()
            }
        }
    }
}
