use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use craftspace_common::{BlockState, Material, WorldId};
use craftspace_config::{Settings, load_craft_types};
use craftspace_geom::{BlockPos, Direction, Rotation};
use craftspace_kernel::sandbox::Sandbox;
use craftspace_kernel::{Craft, CraftHandle, CraftRegistry, CraftType, Pilot, ReleaseOutcome};
use craftspace_material::MaterialPredicate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "craftspace-cli", about = "CLI tool for craftspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (YAML or JSON); defaults apply when absent
    #[arg(short, long, default_value = "craftspace.yml")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and active settings
    Info,
    /// List craft type definitions in a directory
    Types {
        /// Directory holding *.craft.yml / *.craft.json files
        dir: PathBuf,
    },
    /// Pilot a demo hull in an in-memory world, move it, then release it
    Simulate {
        /// Craft type name to use from --types (built-in Ship when omitted)
        #[arg(short = 't', long)]
        craft_type: Option<String>,
        /// Directory of craft type definitions
        #[arg(long)]
        types: Option<PathBuf>,
        /// Hull length in blocks
        #[arg(short, long, default_value = "6")]
        length: i32,
        /// Moves to make, by direction name (north, ne, up, ...)
        #[arg(short, long = "move")]
        moves: Vec<String>,
        /// Quarter turn to make after moving (cw, ccw)
        #[arg(short, long)]
        rotate: Option<String>,
        /// Release through the timer instead of immediately
        #[arg(short, long)]
        wait: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;

    match cli.command {
        Commands::Info => {
            let config = settings.registry_config();
            println!("craftspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("release delay: {:?}", config.release_delay);
            println!("covering: {}", config.covering);
            println!("messages: {} templates", settings.catalog().len());
        }
        Commands::Types { dir } => {
            let types = load_craft_types(&dir)
                .with_context(|| format!("loading craft types from {}", dir.display()))?;
            if types.is_empty() {
                println!("no craft types in {}", dir.display());
            }
            for t in &types {
                println!(
                    "{}: allowed={} forbidden={} size={}..={} height={}..={}{}",
                    t.name,
                    t.allowed,
                    t.forbidden,
                    t.min_size,
                    t.max_size,
                    t.min_height,
                    t.max_height,
                    if t.cruise_on_pilot { " auto-cruise" } else { "" }
                );
            }
        }
        Commands::Simulate {
            craft_type,
            types,
            length,
            moves,
            rotate,
            wait,
        } => {
            let craft_type = resolve_type(craft_type, types)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .context("starting timer runtime")?;
            runtime.block_on(simulate(&settings, craft_type, length, &moves, rotate.as_deref(), wait))?;
        }
    }

    Ok(())
}

fn demo_type() -> CraftType {
    let mut t = CraftType::new(
        "Ship",
        MaterialPredicate::of_all([Material::WOOD, Material::WOOL, Material::FURNACE]),
    );
    t.forbidden = MaterialPredicate::of(Material::TNT);
    t.smoke_on_cruise = true;
    t.smoke_sources = MaterialPredicate::of(Material::FURNACE);
    t
}

fn resolve_type(name: Option<String>, dir: Option<PathBuf>) -> anyhow::Result<CraftType> {
    let Some(dir) = dir else {
        if let Some(name) = name {
            bail!("--craft-type {name} needs --types <dir>");
        }
        return Ok(demo_type());
    };
    let types = load_craft_types(&dir)
        .with_context(|| format!("loading craft types from {}", dir.display()))?;
    match name {
        Some(name) => match types.into_iter().find(|t| t.name == name) {
            Some(t) => Ok(t),
            None => bail!("no craft type named {name} in {}", dir.display()),
        },
        None => match types.into_iter().next() {
            Some(t) => Ok(t),
            None => bail!("no craft types in {}", dir.display()),
        },
    }
}

/// A 3-wide wooden deck with a furnace amidships.
fn demo_hull(length: i32, craft_type: &CraftType) -> Vec<(BlockPos, BlockState)> {
    let deck = if craft_type.allowed.matches(Material::WOOD, 0) {
        BlockState::of(Material::WOOD)
    } else {
        BlockState::of(Material::WOOL)
    };
    let mut region = Vec::new();
    for x in 0..length {
        for z in 0..3 {
            region.push((BlockPos::new(x, 64, z), deck));
        }
    }
    if craft_type.allowed.matches(Material::FURNACE, 0) {
        region.push((BlockPos::new(length / 2, 65, 1), BlockState::of(Material::FURNACE)));
    }
    region
}

async fn simulate(
    settings: &Settings,
    craft_type: CraftType,
    length: i32,
    moves: &[String],
    rotate: Option<&str>,
    wait: bool,
) -> anyhow::Result<()> {
    if length < 1 {
        bail!("hull length must be at least 1");
    }
    let sandbox = Sandbox::with_messages(settings.catalog());
    let registry = CraftRegistry::new(settings.registry_config(), sandbox.collaborators());
    let world = WorldId::new();

    // Debris on deck and a moored post beside the hull.
    sandbox.world.set(world, BlockPos::new(0, 65, 0), BlockState::of(Material::SNOW_LAYER));
    sandbox.world.set(world, BlockPos::new(-1, 64, 1), BlockState::of(Material::WOOD));

    let region = demo_hull(length, &craft_type);
    let craft = Craft::assemble(Arc::new(craft_type), world, region).context("assembling demo hull")?;
    println!("assembled {} ({} blocks) at {}", craft.craft_type().name, craft.size(), craft.bounds());
    let craft = CraftHandle::new(craft);
    let pilot = Pilot::new("captain");
    registry.admit(&craft, pilot.clone());
    registry.set_cruising(&craft, true);

    for name in moves {
        let Some(direction) = Direction::from_name(name) else {
            bail!("unknown direction {name:?}");
        };
        match registry.translate(&craft, direction.offset()) {
            Ok(plan) => println!(
                "moved {direction}: {} deltas, bounds {}",
                plan.deltas().len(),
                craft.lock().bounds()
            ),
            Err(err) => println!("move {direction} refused: {err}"),
        }
    }

    if let Some(name) = rotate {
        let Some(rotation) = Rotation::from_name(name) else {
            bail!("unknown rotation {name:?}");
        };
        let pivot = craft.lock().bounds().center();
        match registry.rotate(&craft, pivot, rotation) {
            Ok(plan) => println!(
                "turned {rotation} about {pivot}: {} deltas, bounds {}",
                plan.deltas().len(),
                craft.lock().bounds()
            ),
            Err(err) => println!("turn {rotation} refused: {err}"),
        }
    }

    if wait {
        registry.schedule_release(&craft)?;
        let delay = registry.config().release_delay;
        println!("waiting {delay:?} for the release timer");
        tokio::time::sleep(delay + Duration::from_millis(100)).await;
    } else {
        match registry.release(&craft) {
            ReleaseOutcome::Released { destroyed } => {
                println!("released, {destroyed} binding blocks destroyed")
            }
            outcome => println!("release: {outcome:?}"),
        }
    }

    for message in sandbox.notifier.sent_to(pilot.id) {
        println!("to {}: {message}", pilot.name);
    }
    for event in registry.drain_events() {
        println!("event: {event:?}");
    }
    Ok(())
}
