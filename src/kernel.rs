// kernel.rs — compute kernel compilation.
//
// The kernel is fixed: one WGSL source, one entry point, one binding (the
// read-write image at slot 0). It is recompiled on every pipeline call —
// there is no module or pipeline cache, by contract.
//
// ERROR SCOPES:
// wgpu reports shader and pipeline validation failures through the
// uncaptured-error handler (a panic by default), not through return values.
// To turn them into `GpuError` values we wrap each creation step in a
// validation error scope: push before, pop after, and any error raised in
// between is delivered to the pop. Shader-module validation and pipeline
// creation get separate scopes so `CompilationFailed` (bad source) stays
// distinguishable from `KernelCreationFailed` (module rejected by the
// device, e.g. a missing entry point).

use crate::device::GpuDevice;
use crate::error::GpuError;

/// The fixed kernel source, embedded at build time.
pub const KERNEL_SOURCE: &str = include_str!("shaders/update_pixels.wgsl");

/// The fixed entry-point symbol within [`KERNEL_SOURCE`].
pub const KERNEL_ENTRY_POINT: &str = "CSMain";

/// A compiled compute kernel bound to one device.
///
/// Immutable once created; owned by the pipeline call that compiled it and
/// dropped with it.
#[derive(Debug)]
pub struct ComputeKernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl ComputeKernel {
    /// Compile the fixed pixel-update kernel against `gpu`.
    pub fn compile(gpu: &GpuDevice) -> Result<Self, GpuError> {
        Self::compile_source(gpu, KERNEL_SOURCE, KERNEL_ENTRY_POINT)
    }

    /// Compile arbitrary WGSL source with the fixed resource layout.
    ///
    /// The production path always uses [`KERNEL_SOURCE`]; this exists so
    /// tests can provoke compilation and kernel-creation failures.
    ///
    /// # Errors
    /// [`GpuError::CompilationFailed`] when the source fails WGSL
    /// validation; [`GpuError::KernelCreationFailed`] when the device
    /// rejects the validated module (e.g. `entry_point` not found).
    pub fn compile_source(
        gpu: &GpuDevice,
        source: &str,
        entry_point: &str,
    ) -> Result<Self, GpuError> {
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("update_pixels.wgsl"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GpuError::CompilationFailed(e.to_string()));
        }

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout =
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("update_pixels BGL"),
                    entries: &[
                        // 0 — the pixel image, read-write storage access.
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::StorageTexture {
                                access: wgpu::StorageTextureAccess::ReadWrite,
                                format: wgpu::TextureFormat::R32Sint,
                                view_dimension: wgpu::TextureViewDimension::D2,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout =
            gpu.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("update_pixels pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    push_constant_ranges: &[],
                });

        let pipeline =
            gpu.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some("update_pixels"),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GpuError::KernelCreationFailed(e.to_string()));
        }

        Ok(ComputeKernel {
            pipeline,
            bind_group_layout,
        })
    }
}
