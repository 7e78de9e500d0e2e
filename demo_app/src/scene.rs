//! Demo scene: a shader, a texture, and a changing set of meshes

use rand::Rng;

use context_graph::prelude::*;

use crate::device::{MockDevice, ObjectKind};
use crate::resources::GpuResource;

/// Vertex buffer, index buffer, and the vertex array binding them
#[derive(Debug)]
pub struct Mesh {
    vertex_array: GpuResource,
    vertices: GpuResource,
    indices: GpuResource,
    revision: u32,
}

impl Mesh {
    fn new(registry: &SharedRegistry, device: &MockDevice, label: &str) -> ContextResult<Self> {
        let vertices = GpuResource::buffer(registry, device, format!("{label}.vertices.0"));
        let indices = GpuResource::buffer(registry, device, format!("{label}.indices"));
        let vertex_array = GpuResource::vertex_array(
            registry,
            device,
            format!("{label}.vao"),
            &[&vertices, &indices],
        )?;

        Ok(Self {
            vertex_array,
            vertices,
            indices,
            revision: 0,
        })
    }
}

/// Per-run drawing counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames where everything bound successfully
    pub drawn: u64,
    /// Frames skipped because no context was current
    pub skipped: u64,
    /// Frames where some object failed to bind
    pub failed: u64,
}

/// Everything the demo draws
#[derive(Debug)]
pub struct Scene {
    registry: SharedRegistry,
    device: MockDevice,
    shader: GpuResource,
    texture: GpuResource,
    meshes: Vec<Mesh>,
    spawned: usize,
    stats: FrameStats,
}

impl Scene {
    /// Build the initial scene
    pub fn new(registry: &SharedRegistry, device: &MockDevice, initial_meshes: usize) -> ContextResult<Self> {
        let mut scene = Self {
            registry: registry.clone(),
            device: device.clone(),
            shader: GpuResource::new(registry, device, ObjectKind::Shader, "basic"),
            texture: GpuResource::new(registry, device, ObjectKind::Texture, "albedo"),
            meshes: Vec::new(),
            spawned: 0,
            stats: FrameStats::default(),
        };
        for _ in 0..initial_meshes {
            scene.spawn_mesh()?;
        }
        Ok(scene)
    }

    /// Add a mesh. It is usable at once if the context is active.
    pub fn spawn_mesh(&mut self) -> ContextResult<()> {
        let label = format!("mesh{}", self.spawned);
        self.spawned += 1;
        self.meshes.push(Mesh::new(&self.registry, &self.device, &label)?);
        log::debug!("Spawned {} ({} mesh(es))", label, self.meshes.len());
        Ok(())
    }

    /// Drop a random mesh, keeping at least one
    pub fn despawn_mesh(&mut self, rng: &mut impl Rng) {
        if self.meshes.len() <= 1 {
            return;
        }
        let mesh = self.meshes.swap_remove(rng.gen_range(0..self.meshes.len()));
        log::debug!("Despawned {}", mesh.vertex_array.label());
    }

    /// Give a random mesh a new vertex buffer, as when its geometry is re-uploaded
    pub fn rewire_mesh(&mut self, rng: &mut impl Rng) -> ContextResult<()> {
        if self.meshes.is_empty() {
            return Ok(());
        }
        let index = rng.gen_range(0..self.meshes.len());
        let mesh = &mut self.meshes[index];

        mesh.revision += 1;
        let base = mesh.vertex_array.label().trim_end_matches(".vao").to_string();
        let vertices = GpuResource::buffer(
            &self.registry,
            &self.device,
            format!("{}.vertices.{}", base, mesh.revision),
        );
        mesh.vertex_array.set_inputs(&[&vertices, &mesh.indices])?;

        // The old buffer is released here, after the vertex array let go of it
        mesh.vertices = vertices;
        log::debug!("Rewired {} to revision {}", base, mesh.revision);
        Ok(())
    }

    /// Bind everything as a draw would
    pub fn draw(&mut self) {
        if !self.device.is_current() {
            self.stats.skipped += 1;
            return;
        }

        let mut ok = self.shader.bind() && self.texture.bind();
        for mesh in &self.meshes {
            ok &= mesh.vertex_array.bind();
        }

        if ok {
            self.stats.drawn += 1;
        } else {
            self.stats.failed += 1;
        }
    }

    /// Number of meshes in the scene
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Drawing counters
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }
}
