mod import;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::warn;
use std::path::{Path, PathBuf};
use terrabake_core::Host;
use terrabake_pipeline::{Pipeline, PipelineConfig, PipelineMode};
use terrabake_scene::{MemoryScene, SceneSettings};

#[derive(Parser)]
#[command(name = "terrabake", version, about = "Bake terrain lighting into textures and export glTF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the pipeline once over an OBJ file or a saved snapshot
    Run(RunArgs),
    /// List the contents of a debug snapshot
    Inspect { snapshot: PathBuf },
}

#[derive(Args)]
struct RunArgs {
    /// `.obj` scene or `.snapshot` written by an earlier run
    #[arg(long)]
    scene: PathBuf,

    /// JSON pipeline config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// per-object, merge, merge-then-bake or bake-then-merge
    #[arg(long)]
    mode: Option<PipelineMode>,

    /// Object name prefix to select (repeatable)
    #[arg(long = "prefix")]
    prefixes: Vec<String>,

    /// glTF binary output path (repeatable)
    #[arg(long = "output")]
    outputs: Vec<PathBuf>,

    /// Where baked images without a file path are written
    #[arg(long, default_value = "baked")]
    image_dir: PathBuf,

    /// Debug snapshot path
    #[arg(long, conflicts_with = "no_snapshot")]
    snapshot: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    no_snapshot: bool,

    /// Abort on the first object that fails to normalize or bake
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match Cli::parse().cmd {
        Cmd::Run(args) => run(args),
        Cmd::Inspect { snapshot } => inspect(&snapshot),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let start_total = std::time::Instant::now();
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if !args.prefixes.is_empty() {
        config.name_prefixes = args.prefixes;
    }
    if !args.outputs.is_empty() {
        config.export_paths = args.outputs;
    }
    if args.snapshot.is_some() {
        config.debug_snapshot = args.snapshot;
    }
    if args.no_snapshot {
        config.debug_snapshot = None;
    }
    if args.strict {
        config.continue_on_error = false;
    }

    let settings = SceneSettings {
        image_dir: args.image_dir,
        ..Default::default()
    };
    let mut scene = load_scene(&args.scene, settings)?;
    println!("Loaded {} ({} objects)", args.scene.display(), scene.objects().len());

    let report = Pipeline::new(&mut scene, config)
        .run()
        .with_context(|| format!("pipeline failed on {}", args.scene.display()))?;
    print!("{}", report);
    if !report.is_clean() {
        warn!("finished with {} failures", report.failure_count());
    }
    println!("Total execution time: {:.2}s", start_total.elapsed().as_secs_f32());
    Ok(())
}

fn load_scene(path: &Path, settings: SceneSettings) -> Result<MemoryScene> {
    if path.extension().is_some_and(|e| e == "snapshot") {
        return MemoryScene::load_document(path, settings)
            .with_context(|| format!("Failed to load snapshot: {}", path.display()));
    }
    let mut scene = MemoryScene::new(settings);
    import::import_obj(&mut scene, path)?;
    Ok(scene)
}

fn inspect(path: &Path) -> Result<()> {
    let scene = MemoryScene::load_document(path, SceneSettings::default())
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))?;

    println!("objects:");
    for id in scene.objects() {
        let object = scene.object(id)?;
        let slots: Vec<String> = object
            .material_slots
            .iter()
            .map(|slot| match slot {
                Some(material) => scene.material(*material).map(|m| m.name).unwrap_or_else(|_| material.to_string()),
                None => "-".to_string(),
            })
            .collect();
        println!(
            "  {} {}{} slots {:?} active {:?}",
            object.name,
            object.mesh.map(|m| m.to_string()).unwrap_or_default(),
            if object.linked { "" } else { " (unlinked)" },
            slots,
            object.active_material_slot
        );
    }
    println!("meshes:");
    for id in scene.meshes() {
        let mesh = scene.mesh(id)?;
        println!("  {} {}: {} vertices, {} faces", id, mesh.name, mesh.vertex_count, mesh.face_count);
        for uv in &mesh.uv_channels {
            println!(
                "    uv {}{}{}",
                uv.name,
                if uv.active { " active" } else { "" },
                if uv.active_render { " render" } else { "" }
            );
        }
    }
    println!("materials:");
    for id in scene.materials() {
        let material = scene.material(id)?;
        let nodes = material.nodes.as_ref().map_or(0, Vec::len);
        println!("  {} {}: {} nodes", id, material.name, nodes);
    }
    println!("images:");
    for id in scene.images() {
        let image = scene.image(id)?;
        let file = image.filepath.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        println!("  {} {}x{} {}", image.name, image.width, image.height, file);
    }
    Ok(())
}
