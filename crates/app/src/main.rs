//! Entry point for the studio command-line tool.
//! Drives the project database and the texture loader without a GUI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use project::{AssetKind, ProjectData, WindowConfig};
use renderer::{GpuContext, GpuTexture};

const USAGE: &str = "\
usage: studio <command> [args] [--flags]

commands:
  new <project>                   write an empty project
  list <project>                  print assets and window settings
  add <project> <kind> <name>     add an asset (object, sound, sprite, tileset, background, room)
  rename <project> <old> <new>    rename an asset
  texture <image>                 decode an image and upload it to the GPU

flags:
  --gpu-backend=auto|vulkan|dx12|metal|gl
  --title=<text>                  window title for `new`";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    New(PathBuf),
    List(PathBuf),
    Add {
        project: PathBuf,
        kind: AssetKind,
        name: String,
    },
    Rename {
        project: PathBuf,
        old: String,
        new: String,
    },
    Texture(PathBuf),
}

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_title_arg(args: &[String]) -> Option<String> {
    args.iter()
        .rev()
        .find_map(|arg| arg.strip_prefix("--title="))
        .map(str::to_owned)
}

fn parse_command(args: &[String]) -> Result<Command> {
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    let path = |i: usize| -> Result<PathBuf> {
        positional
            .get(i)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("missing argument\n\n{USAGE}"))
    };
    let word = |i: usize| -> Result<String> {
        positional
            .get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("missing argument\n\n{USAGE}"))
    };

    match positional.first().copied() {
        Some("new") => Ok(Command::New(path(1)?)),
        Some("list") => Ok(Command::List(path(1)?)),
        Some("add") => {
            let kind = word(2)?;
            Ok(Command::Add {
                project: path(1)?,
                kind: AssetKind::parse(&kind)
                    .ok_or_else(|| anyhow!("unknown asset kind '{kind}'"))?,
                name: word(3)?,
            })
        }
        Some("rename") => Ok(Command::Rename {
            project: path(1)?,
            old: word(2)?,
            new: word(3)?,
        }),
        Some("texture") => Ok(Command::Texture(path(1)?)),
        Some(other) => bail!("unknown command '{other}'\n\n{USAGE}"),
        None => bail!("{USAGE}"),
    }
}

fn open_project(path: &Path) -> Result<ProjectData> {
    let mut project = ProjectData::new();
    project
        .load_project_file_into_database(path)
        .with_context(|| format!("Failed to load project {}", path.display()))?;
    Ok(project)
}

fn save_project(project: &mut ProjectData, path: &Path) -> Result<()> {
    project
        .save_current_project_to_file(path)
        .with_context(|| format!("Failed to save project {}", path.display()))
}

fn print_project(project: &ProjectData) {
    println!("project: {}", project.game_name());
    let mut entries: Vec<_> = project.entries().collect();
    entries.sort_by_key(|e| e.id);
    for entry in entries {
        println!("  {:>4}  {:<10}  {}", entry.id.0, entry.kind.to_string(), entry.name);
    }
    match project.window_config() {
        Some(WindowConfig {
            width,
            height,
            scale,
            draw_color,
            title,
            fps,
            default_room,
        }) => {
            println!(
                "window: {width}x{height} x{scale} @ {fps} fps, color #{draw_color}, title '{title}', default room '{default_room}'"
            );
        }
        None => println!("window: <missing>"),
    }
}

fn run(command: Command, args: &[String]) -> Result<()> {
    match command {
        Command::New(path) => {
            let mut project = ProjectData::new();
            if let Some(title) = parse_title_arg(args) {
                let config = WindowConfig {
                    title,
                    ..WindowConfig::default()
                };
                project.set_window_config(&config)?;
            }
            save_project(&mut project, &path)?;
        }
        Command::List(path) => print_project(&open_project(&path)?),
        Command::Add {
            project: path,
            kind,
            name,
        } => {
            let mut project = open_project(&path)?;
            let id = project.add_asset(kind, &name)?;
            save_project(&mut project, &path)?;
            log::info!("Added {kind} '{name}' as {id}");
        }
        Command::Rename {
            project: path,
            old,
            new,
        } => {
            let mut project = open_project(&path)?;
            project.rename_asset(&old, &new)?;
            save_project(&mut project, &path)?;
        }
        Command::Texture(path) => {
            let gpu = GpuContext::headless(parse_backend_arg(args))?;
            let mut backend = gpu.backend();
            let texture = GpuTexture::load(&path, &mut backend)
                .with_context(|| format!("Failed to load texture {}", path.display()))?;
            let (width, height) = texture.size();
            println!(
                "{}: {width}x{height} {:?}",
                path.display(),
                texture.format()
            );
            texture.destroy(&mut backend);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;
    log::debug!("Running {:?}", command);
    run(command, &args)
}
