// device.rs — per-call GPU device acquisition.
//
// Every pipeline invocation acquires its own device and releases it on exit.
// Nothing is cached across calls — device creation cost is paid every time.
// That matches the contract of the `UpdatePixels` entry point: each call is
// fully independent, so concurrent calls never share mutable GPU state.
//
// ADAPTER SELECTION:
// We take the platform-default adapter with no feature-level negotiation.
// `request_adapter` with default options picks the first suitable adapter on
// the primary backends (Vulkan/Metal/DX12). The only hard requirement is
// compute-shader support, which downlevel D3D/GL adapters may lack — checked
// explicitly so the failure is a `DeviceUnavailable` value instead of a
// validation panic three stages later.

use std::fmt;

use crate::error::GpuError;

/// Cached adapter information for logging and diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.name, self.backend, self.device_type
        )
    }
}

/// A live GPU device and its submission queue.
///
/// Owns every resource created through it; dropping the `GpuDevice` releases
/// the logical device. One `GpuDevice` serves exactly one pipeline call.
///
/// # Field drop order
/// Rust drops struct fields in declaration order (top → bottom).
/// `_instance` is declared last so the `wgpu::Instance` outlives `device`
/// and `queue` — some drivers crash if the instance is destroyed while
/// device-level objects still hold back-references to it.
#[derive(Debug)]
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    /// Keeps the `wgpu::Instance` alive until `device` and `queue` are
    /// dropped. Never accessed directly.
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Acquire the platform-default GPU device, blocking the calling thread.
    ///
    /// # Errors
    /// Returns [`GpuError::DeviceUnavailable`] when no adapter is found, the
    /// adapter lacks compute-shader support, or the device request fails.
    pub fn acquire() -> Result<Self, GpuError> {
        pollster::block_on(Self::acquire_async())
    }

    async fn acquire_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or_else(|| {
                GpuError::DeviceUnavailable("no compatible GPU adapter found".into())
            })?;

        // Downlevel adapters (old GL, D3D feature levels) may not support
        // compute at all. Abort here rather than failing at dispatch.
        let capabilities = adapter.get_downlevel_capabilities();
        if !capabilities
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(GpuError::DeviceUnavailable(format!(
                "adapter '{}' does not support compute shaders",
                adapter.get_info().name
            )));
        }

        let raw_info = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device: raw_info.device,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gpupixel"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceUnavailable(e.to_string()))?;

        log::info!("acquired GPU device: {adapter_info}");

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            _instance: instance,
        })
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GpuDevice {{ adapter: {} }}", self.adapter_info)
    }
}
