//! Context loss demo
//!
//! Runs a scene of device objects through a seeded sequence of frames in
//! which the context is repeatedly lost and restored, meshes come and go,
//! and vertex arrays are rebound to new buffers. The mock device records
//! every ordering mistake; the run fails if it saw any.
//!
//! Usage: `context_loss_demo [config.toml|config.ron] [seed]`

mod device;
mod resources;
mod scene;

use std::path::Path;

use rand::prelude::*;
use thiserror::Error;

use context_graph::foundation::logging;
use context_graph::prelude::*;

use crate::device::{DeviceError, MockDevice};
use crate::scene::Scene;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demo_config.toml");
const DEFAULT_SEED: u64 = 0x00c0_ffee;
const FRAMES: u32 = 600;
const INITIAL_MESHES: usize = 4;
const MAX_MESHES: usize = 12;

/// Reasons the demo can fail
#[derive(Debug, Error)]
enum DemoError {
    #[error("Registry error: {0}")]
    Context(#[from] ContextError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed '{0}'")]
    Seed(String),

    #[error("{count} device error(s), first: {first}")]
    Device { count: usize, first: DeviceError },
}

/// Something that happens between two frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameEvent {
    LoseContext,
    RestoreContext,
    SpawnMesh,
    DespawnMesh,
    RewireMesh,
    Nothing,
}

impl FrameEvent {
    fn roll(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..100) {
            0..=3 => Self::LoseContext,
            4..=11 => Self::RestoreContext,
            12..=21 => Self::SpawnMesh,
            22..=29 => Self::DespawnMesh,
            30..=41 => Self::RewireMesh,
            _ => Self::Nothing,
        }
    }
}

fn load_config(path: Option<&str>) -> Result<ContextConfig, ConfigError> {
    let config = match path {
        Some(path) => ContextConfig::load_from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => ContextConfig::load_from_file(DEFAULT_CONFIG)?,
        None => ContextConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn parse_seed(arg: Option<&str>) -> Result<u64, DemoError> {
    arg.map_or(Ok(DEFAULT_SEED), |seed| {
        seed.parse().map_err(|_| DemoError::Seed(seed.to_string()))
    })
}

/// Platform side of a context loss: tell the registry first, then lose the device
fn lose_context(host: &mut ContextHost, device: &MockDevice) -> ContextResult<()> {
    host.handle_event(HostEvent::ContextDestroyed)?;
    device.lose();
    Ok(())
}

/// Platform side of a restore: the device is usable before the registry hears of it
fn restore_context(host: &mut ContextHost, device: &MockDevice) -> ContextResult<()> {
    device.restore();
    host.handle_event(HostEvent::ContextReset)
}

fn run(config: &ContextConfig, seed: u64) -> Result<(), DemoError> {
    let registry = SharedRegistry::with_config(config.registry.clone());
    let device = MockDevice::new();
    let mut host = ContextHost::new(registry.clone());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut scene = Scene::new(&registry, &device, INITIAL_MESHES)?;
    restore_context(&mut host, &device)?;

    for frame in 0..FRAMES {
        match FrameEvent::roll(&mut rng) {
            FrameEvent::LoseContext => {
                log::info!("Frame {}: context lost", frame);
                lose_context(&mut host, &device)?;
            }
            FrameEvent::RestoreContext => {
                // Frontends often send resets that change nothing
                restore_context(&mut host, &device)?;
            }
            FrameEvent::SpawnMesh if scene.mesh_count() < MAX_MESHES => scene.spawn_mesh()?,
            FrameEvent::DespawnMesh => scene.despawn_mesh(&mut rng),
            FrameEvent::RewireMesh => scene.rewire_mesh(&mut rng)?,
            FrameEvent::SpawnMesh | FrameEvent::Nothing => {}
        }
        scene.draw();
    }

    lose_context(&mut host, &device)?;
    let frames = scene.stats();
    drop(scene);

    let registry_stats = registry.borrow().stats();
    let device_stats = device.stats();
    log::info!(
        "Frames: {} drawn, {} skipped without context, {} failed",
        frames.drawn,
        frames.skipped,
        frames.failed
    );
    log::info!(
        "Registry: {} listener(s) left, {} context generation(s), {} activation(s), {} deactivation(s)",
        registry_stats.listeners,
        registry_stats.context_generation,
        registry_stats.activations_fired,
        registry_stats.deactivations_fired
    );
    log::info!(
        "Device: {} created, {} deleted, {} loss(es), {} host transition(s)",
        device_stats.created,
        device_stats.deleted,
        device_stats.losses,
        host.transitions()
    );

    let errors = device.errors();
    match errors.first() {
        Some(first) => Err(DemoError::Device {
            count: errors.len(),
            first: first.clone(),
        }),
        None => Ok(()),
    }
}

fn main() -> Result<(), DemoError> {
    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str))?;
    logging::init_from_config(&config.logging);
    let seed = parse_seed(args.get(2).map(String::as_str))?;

    log::info!("Starting context loss demo (seed {:#x})", seed);
    let result = run(&config, seed);

    match &result {
        Ok(()) => log::info!("Context loss demo completed without device errors"),
        Err(err) => log::error!("Context loss demo failed: {}", err),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_config_is_found_from_any_directory() {
        let config = load_config(None).unwrap();
        assert_eq!(config.registry.name, "demo");
        assert_eq!(config.registry.initial_capacity, 32);
    }

    #[test]
    fn test_seed_argument() {
        assert_eq!(parse_seed(None).unwrap(), DEFAULT_SEED);
        assert_eq!(parse_seed(Some("42")).unwrap(), 42);
        assert!(matches!(parse_seed(Some("soon")), Err(DemoError::Seed(_))));
    }
}
