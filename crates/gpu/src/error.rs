use pps_kernel::BackendError;

/// Fatal start-up failures of the GPU path.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("buffer or bind group creation failed: {0}")]
    ResourceBuild(String),
    #[error("shader or pipeline build failed: {0}")]
    ShaderBuild(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
