/// Bundle of collaborator interfaces handed to the view system, scene, and
/// layers.
///
/// Every field is an `Arc<Mutex<dyn Trait>>`; cloning the bundle clones the
/// shared references. Locks are taken per call on the render thread.

use std::sync::{Arc, Mutex};
use super::cameras::CameraRegistry;
use super::frontend::RendererFrontend;
use super::geometry::GeometrySystem;
use super::materials::MaterialSystem;
use super::mesh_manager::MeshManager;
use super::pipelines::PipelineRegistry;
use super::pools::{IndirectDrawPool, InstanceBufferPool};
use super::world_resources::WorldResources;

/// Shared collaborator bundle.
#[derive(Clone)]
pub struct RenderServices {
    pub renderer: Arc<Mutex<dyn RendererFrontend>>,
    pub mesh_manager: Arc<Mutex<dyn MeshManager>>,
    pub pipelines: Arc<Mutex<dyn PipelineRegistry>>,
    pub materials: Arc<Mutex<dyn MaterialSystem>>,
    pub geometries: Arc<Mutex<dyn GeometrySystem>>,
    pub cameras: Arc<Mutex<dyn CameraRegistry>>,
    pub instance_pool: Arc<Mutex<dyn InstanceBufferPool>>,
    pub indirect_pool: Arc<Mutex<dyn IndirectDrawPool>>,
    pub world_resources: Arc<Mutex<dyn WorldResources>>,
}
