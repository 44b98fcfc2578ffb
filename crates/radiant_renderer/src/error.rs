use std::path::PathBuf;

use radiant_assets::MaterialError;
use radiant_scene::SceneError;
use thiserror::Error;

use crate::render::RendererState;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no suitable GPU adapter: {0}")]
    DeviceUnavailable(#[from] wgpu::RequestAdapterError),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("pipeline build failed: {0}")]
    PipelineBuild(String),
    #[error("failed to set up scene {path}: {source}")]
    SceneSetup {
        path: PathBuf,
        source: SetupError,
    },
}

/// Why a scene could not be bound to the renderer.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error("GPU allocation failed: {0}")]
    Allocation(String),
    #[error("renderer is {0:?}, a scene needs a ready pipeline")]
    NotReady(RendererState),
}
