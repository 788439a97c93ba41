//! octrace CLI - render and inspect sparse voxel octree scenes
//!
//! Produces reference frames for checking hardware tracer output, dumps the
//! packed node image for RTL simulation, and compares rendered images.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use octrace_kernel::{shade, CameraPreset, PackedOctree, Rgb, Scene, ShadingMode, Trace};
use octrace_math::Vec3;

mod image_io;

#[derive(Parser)]
#[command(name = "octrace")]
#[command(about = "Integer-lattice octree ray tracer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene to an image
    Render {
        #[command(flatten)]
        source: SceneSource,
        #[command(flatten)]
        view: ViewArgs,
        /// Output image (format determined by extension: .png, .ppm)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Trace a single pixel and print what its ray hits
    Trace {
        #[command(flatten)]
        source: SceneSource,
        #[command(flatten)]
        view: ViewArgs,
        /// Pixel as x,y with 0,0 at the top-left
        #[arg(long, value_parser = parse_pixel)]
        pixel: [u32; 2],
    },
    /// Write the packed node image as a .mem file
    Pack {
        #[command(flatten)]
        source: SceneSource,
        /// Output .mem file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare two images pixel by pixel
    Compare {
        /// Reference image
        expected: PathBuf,
        /// Image under test
        actual: PathBuf,
    },
    /// Display information about a scene
    Info {
        #[command(flatten)]
        source: SceneSource,
    },
    /// Write a scene document, with any view overrides applied
    Export {
        #[command(flatten)]
        source: SceneSource,
        #[command(flatten)]
        view: ViewArgs,
        /// Output .json file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Built-in scenes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Demo {
    /// One white cube in a 4x4x4 world
    Corner,
    /// Three coloured cubes in a 1024 world
    Shaded,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SceneSource {
    /// Scene document (.json)
    scene: Option<PathBuf>,
    /// Use a built-in scene instead of a file
    #[arg(long, value_enum)]
    demo: Option<Demo>,
}

#[derive(Args, Debug, Default)]
struct ViewArgs {
    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,
    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,
    /// Axis-aligned camera view (+z, -z, +y, -y, +x, -x); also moves the
    /// camera to the preset's position unless --position is given
    #[arg(long, allow_hyphen_values = true)]
    preset: Option<CameraPreset>,
    /// Camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    position: Option<[f64; 3]>,
    /// Use raw material colours without lighting
    #[arg(long, conflicts_with = "gamma")]
    flat: bool,
    /// Lit shading with this display gamma
    #[arg(long)]
    gamma: Option<f64>,
    /// Background colour as r,g,b or #rrggbb
    #[arg(long, value_parser = parse_rgb)]
    background: Option<Rgb>,
}

impl ViewArgs {
    fn apply(&self, scene: &mut Scene) {
        let bit_length = scene.octree.bit_length();
        let camera = &mut scene.camera;
        if let Some(preset) = self.preset {
            let (forward, right, up) = preset.basis();
            camera.forward = forward;
            camera.right = right;
            camera.up = up;
            camera.position = preset.position(bit_length);
        }
        if let Some([x, y, z]) = self.position {
            camera.position = Vec3::new(x, y, z);
        }
        if let Some(width) = self.width {
            camera.image_width = width;
        }
        if let Some(height) = self.height {
            camera.image_height = height;
        }

        if self.flat {
            scene.settings.shading = ShadingMode::Flat;
        } else if let Some(gamma) = self.gamma {
            scene.settings.shading = ShadingMode::Lit { gamma };
        }
        if let Some(background) = self.background {
            scene.settings.background = background;
        }
    }
}

fn parse_vec3(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid coordinate in '{s}': {e}"))?;
    parts
        .try_into()
        .map_err(|_| format!("expected x,y,z, got '{s}'"))
}

fn parse_pixel(s: &str) -> Result<[u32; 2], String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid pixel coordinate in '{s}': {e}"))?;
    parts
        .try_into()
        .map_err(|_| format!("expected x,y, got '{s}'"))
}

fn parse_rgb(s: &str) -> Result<Rgb, String> {
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 {
            return Err(format!("expected #rrggbb, got '{s}'"));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|e| format!("'{s}': {e}"))?;
        return Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8]);
    }
    let parts: Vec<u8> = s
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid channel in '{s}': {e}"))?;
    parts
        .try_into()
        .map_err(|_| format!("expected r,g,b, got '{s}'"))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            source,
            view,
            output,
        } => {
            let scene = load_scene(&source, &view)?;
            render(&scene, &output)?;
        }
        Commands::Trace {
            source,
            view,
            pixel: [x, y],
        } => {
            let scene = load_scene(&source, &view)?;
            trace(&scene, x, y)?;
        }
        Commands::Pack { source, output } => {
            let scene = load_scene(&source, &ViewArgs::default())?;
            pack(&scene, output.as_deref())?;
        }
        Commands::Compare { expected, actual } => {
            compare(&expected, &actual)?;
        }
        Commands::Info { source } => {
            let scene = load_scene(&source, &ViewArgs::default())?;
            show_info(&scene)?;
        }
        Commands::Export {
            source,
            view,
            output,
        } => {
            let scene = load_scene(&source, &view)?;
            fs::write(&output, scene.to_json()?)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote scene to {}", output.display());
        }
    }

    Ok(())
}

fn load_scene(source: &SceneSource, view: &ViewArgs) -> Result<Scene> {
    let mut scene = match (&source.scene, source.demo) {
        (Some(path), _) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Scene::from_json(&json).with_context(|| format!("invalid scene {}", path.display()))?
        }
        (None, Some(Demo::Corner)) => Scene::demo_corner()?,
        (None, Some(Demo::Shaded)) => Scene::demo_shaded()?,
        (None, None) => bail!("no scene given; pass a scene file or --demo"),
    };
    view.apply(&mut scene);
    log::debug!(
        "scene ready: {}x{} image, shading {:?}",
        scene.camera.image_width,
        scene.camera.image_height,
        scene.settings.shading
    );
    Ok(scene)
}

fn render(scene: &Scene, output: &Path) -> Result<()> {
    let frame = scene.render()?;
    image_io::save(&frame, output)?;
    println!(
        "Rendered {}x{} frame to {}",
        frame.width(),
        frame.height(),
        output.display()
    );
    Ok(())
}

fn trace(scene: &Scene, x: u32, y: u32) -> Result<()> {
    let camera = &scene.camera;
    if x >= camera.image_width || y >= camera.image_height {
        bail!(
            "pixel ({x}, {y}) outside {}x{} image",
            camera.image_width,
            camera.image_height
        );
    }

    let ray = camera.generate_ray(x, y);
    println!("Pixel ({x}, {y})");
    println!("  Origin: {:?}", ray.origin.as_slice());
    println!("  Direction: {:?}", ray.direction.as_slice());

    match scene.trace_pixel(x, y)? {
        Trace::Hit(hit) => {
            let color = shade::shade(
                &hit,
                camera,
                &scene.materials,
                scene.settings.shading,
                scene.settings.missing_material,
            )?;
            println!("  Hit material {} after {} marches", hit.material, hit.marches);
            println!("  Position: {:?}", hit.position.as_slice());
            println!(
                "  Leaf box: {:?} - {:?}",
                hit.aabb.min.as_slice(),
                hit.aabb.max.as_slice()
            );
            println!("  Colour: {color:?}");
        }
        Trace::Miss { marches } => {
            println!("  Miss after {marches} marches");
            println!("  Colour: {:?}", scene.settings.background);
        }
    }
    Ok(())
}

fn pack(scene: &Scene, output: Option<&Path>) -> Result<()> {
    let packed = PackedOctree::from_octree(&scene.octree)?;
    let mem = packed.to_mem();
    match output {
        Some(path) => {
            fs::write(path, mem).with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Packed {} words to {}",
                packed.words().len(),
                path.display()
            );
        }
        None => print!("{mem}"),
    }
    Ok(())
}

fn compare(expected: &Path, actual: &Path) -> Result<()> {
    let expected_frame = image_io::load(expected)?;
    let actual_frame = image_io::load(actual)?;
    let diff = expected_frame.diff(&actual_frame)?;

    if diff.is_identical() {
        println!("Images match ({} pixels)", diff.total);
        return Ok(());
    }

    let percent = 100.0 * diff.differing as f64 / diff.total as f64;
    println!(
        "{} of {} pixels differ ({percent:.2}%)",
        diff.differing, diff.total
    );
    if let Some([x, y]) = diff.first {
        println!(
            "  First at ({x}, {y}): expected {:?}, got {:?}",
            expected_frame.pixel(x, y),
            actual_frame.pixel(x, y)
        );
    }
    bail!("images differ")
}

fn show_info(scene: &Scene) -> Result<()> {
    let stats = scene.octree.stats();
    let packed = PackedOctree::from_octree(&scene.octree)?;
    let camera = &scene.camera;

    println!("octrace scene");
    println!(
        "  World: L = {}, {} per axis",
        scene.octree.bit_length(),
        scene.octree.world_size()
    );
    println!("  Nodes: {}", stats.nodes);
    println!(
        "  Leaves: {} ({} occupied)",
        stats.leaves, stats.occupied_leaves
    );
    println!("  Max depth: {}", stats.max_depth);
    println!("  Packed words: {}", packed.words().len());
    println!("  Materials: {}", scene.materials.len());

    println!("\nCamera:");
    println!("  Position: {:?}", camera.position.as_slice());
    println!("  Forward: {:?}", camera.forward.as_slice());
    println!("  Image: {}x{}", camera.image_width, camera.image_height);
    println!("  Shading: {:?}", scene.settings.shading);
    Ok(())
}
