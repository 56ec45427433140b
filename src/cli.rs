//! Command-line interface implementation

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::error::ErrorKind;
use crate::face::FaceRect;
use crate::models::Side;
use crate::output::{save_png, surface_output_path};
use crate::shell::{Shell, ShellOptions};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SideArg {
    Sakura,
    Kero,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Side {
        match arg {
            SideArg::Sakura => Side::Sakura,
            SideArg::Kero => Side::Kero,
        }
    }
}

/// Shellsurf - resolve and composite character shell surfaces to PNG
#[derive(Parser)]
#[command(name = "shellsurf")]
#[command(about = "Resolve and composite character shell surfaces to PNG")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Composite one surface of a shell to a PNG file
    Render {
        /// Shell directory (contains descript.txt and surfaces*.txt)
        shell_dir: PathBuf,

        /// Surface id to render
        #[arg(short, long)]
        surface: i64,

        /// Character side to render
        #[arg(long, value_enum, default_value = "sakura")]
        side: SideArg,

        /// Output file or directory (default: {shell}_s{id}_{side}.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the full canvas instead of trimming to opaque bounds
        #[arg(long)]
        no_trim: bool,

        /// Costume-selection profile file (charN.bind.savearray lines)
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Derive a fixed-size face thumbnail from a surface
    Face {
        /// Shell directory
        shell_dir: PathBuf,

        /// Surface id to derive the face from
        #[arg(short, long)]
        surface: i64,

        /// Character side
        #[arg(long, value_enum, default_value = "sakura")]
        side: SideArg,

        /// Target box width
        #[arg(long, default_value = "120")]
        width: u32,

        /// Target box height
        #[arg(long, default_value = "120")]
        height: u32,

        /// Explicit crop rectangle as left,top,width,height
        /// (overrides the shell's own face entries)
        #[arg(long, value_name = "L,T,W,H")]
        rect: Option<String>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved layer list for a surface as JSON
    Inspect {
        /// Shell directory
        shell_dir: PathBuf,

        /// Surface id to resolve
        #[arg(short, long)]
        surface: i64,

        /// Character side
        #[arg(long, value_enum, default_value = "sakura")]
        side: SideArg,

        /// Costume-selection profile file
        #[arg(long)]
        profile: Option<PathBuf>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render { shell_dir, surface, side, output, no_trim, profile } => {
            run_render(&shell_dir, surface, side.into(), output.as_deref(), !no_trim, profile)
        }
        Commands::Face { shell_dir, surface, side, width, height, rect, output } => {
            run_face(&shell_dir, surface, side.into(), width, height, rect.as_deref(), output.as_deref())
        }
        Commands::Inspect { shell_dir, surface, side, profile } => {
            run_inspect(&shell_dir, surface, side.into(), profile)
        }
    }
}

fn load_shell(dir: &Path, profile: Option<PathBuf>) -> Result<Shell, ExitCode> {
    if !dir.is_dir() {
        eprintln!("Error: '{}' is not a shell directory", dir.display());
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }
    Shell::load_with(dir, ShellOptions { profile, ..Default::default() }).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn run_render(
    shell_dir: &Path,
    surface: i64,
    side: Side,
    output: Option<&Path>,
    trim: bool,
    profile: Option<PathBuf>,
) -> ExitCode {
    let shell = match load_shell(shell_dir, profile) {
        Ok(shell) => shell,
        Err(code) => return code,
    };

    let image = match shell.render_surface(side, surface, trim) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let path = surface_output_path(shell_dir, surface, side, output);
    if let Err(e) = save_png(&image, &path) {
        eprintln!("Error: cannot write '{}': {}", path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Rendered surface {} ({}) -> {}", surface, side, path.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_face(
    shell_dir: &Path,
    surface: i64,
    side: Side,
    width: u32,
    height: u32,
    rect: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    let rect = match rect.map(parse_rect_arg).transpose() {
        Ok(rect) => rect,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let shell = match load_shell(shell_dir, None) {
        Ok(shell) => shell,
        Err(code) => return code,
    };

    let result = match rect {
        // An explicit CLI rectangle bypasses the shell's own face
        // entries entirely.
        Some(rect) => shell
            .render_surface(side, surface, false)
            .and_then(|rendered| {
                crate::face::face_thumbnail(rendered, Some(rect), width, height)
                    .map_err(|kind| kind.on_side(side))
            }),
        None => shell.face_thumbnail(side, surface, width, height),
    };

    let image = match result {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let default = surface_output_path(shell_dir, surface, side, output);
    let path = match output {
        Some(_) => default,
        None => PathBuf::from(format!(
            "{}_face{}_{}.png",
            shell_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "shell".to_string()),
            surface,
            side
        )),
    };
    if let Err(e) = save_png(&image, &path) {
        eprintln!("Error: cannot write '{}': {}", path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Face {}x{} -> {}", width, height, path.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_inspect(shell_dir: &Path, surface: i64, side: Side, profile: Option<PathBuf>) -> ExitCode {
    let shell = match load_shell(shell_dir, profile) {
        Ok(shell) => shell,
        Err(code) => return code,
    };

    match shell.resolve(side, surface) {
        Ok(model) => match serde_json::to_string_pretty(&model) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Parse the `--rect l,t,w,h` argument.
fn parse_rect_arg(text: &str) -> Result<FaceRect, ErrorKind> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(ErrorKind::InvalidInput(format!(
            "--rect expects left,top,width,height, got '{}'",
            text
        )));
    }
    let mut values = [0i64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|_| {
            ErrorKind::InvalidInput(format!("--rect component '{}' is not a number", part))
        })?;
    }
    FaceRect::from_parts(Some(values[0]), Some(values[1]), Some(values[2]), Some(values[3]))?
        .ok_or_else(|| ErrorKind::InvalidInput("empty rectangle".to_string()))
}
