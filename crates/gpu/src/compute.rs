use crate::context::GpuContext;
use crate::error::GpuError;
use crate::shaders;
use pps_common::{Agent, ParamsUniform, SwarmParams};
use pps_kernel::dispatch::group_count;
use pps_kernel::{BackendError, ComputeBackend, Force, FramePlan, GroupSizes, PingPong, Slot, Stage};
use std::sync::Arc;
use std::sync::mpsc;
use wgpu::util::DeviceExt;

const AGENT_SIZE: u64 = std::mem::size_of::<Agent>() as u64;
const FORCE_SIZE: u64 = std::mem::size_of::<Force>() as u64;

/// wgpu compute backend.
///
/// Holds `slot_count` generation buffers, a force buffer and one bind group
/// per read slot; frame `f` always pairs read slot `f mod k` with write slot
/// `(f + 1) mod k`. Each stage is its own compute pass, so pass boundaries
/// order the force writes before integration reads them.
pub struct GpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    agent_count: usize,
    groups: GroupSizes,
    ring: PingPong,
    params_buffer: wgpu::Buffer,
    agents: Vec<wgpu::Buffer>,
    _forces: wgpu::Buffer,
    staging: wgpu::Buffer,
    bind_groups: Vec<wgpu::BindGroup>,
    accumulate: wgpu::ComputePipeline,
    integrate: wgpu::ComputePipeline,
    fused: wgpu::ComputePipeline,
}

impl GpuBackend {
    pub fn new(
        ctx: &GpuContext,
        agent_count: usize,
        slots: usize,
        groups: GroupSizes,
    ) -> Result<Self, GpuError> {
        let ring = PingPong::new(slots)?;
        if agent_count == 0 {
            return Err(GpuError::ResourceBuild("agent buffers need at least one agent".into()));
        }
        let device = ctx.device.clone();
        let agent_bytes = agent_count as u64 * AGENT_SIZE;

        // outer scope: buffers and bind groups
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params_buffer"),
            contents: bytemuck::bytes_of(&SwarmParams::default().to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let agents: Vec<wgpu::Buffer> = ring
            .slots()
            .map(|slot| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("agents_{}", slot.index())),
                    size: agent_bytes,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::VERTEX
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let forces = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("forces"),
            size: agent_count as u64 * FORCE_SIZE,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("agents_readback"),
            size: agent_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("swarm_bind_group_layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, false),
            ],
        });

        let bind_groups = ring
            .slots()
            .map(|read| {
                let write = ring.write_slot(read.index() as u64);
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("swarm_bind_group_{}_{}", read.index(), write.index())),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: params_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: agents[read.index()].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: agents[write.index()].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: forces.as_entire_binding(),
                        },
                    ],
                })
            })
            .collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("swarm_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        // inner scope: shader module and pipelines
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("swarm_kernels"),
            source: wgpu::ShaderSource::Wgsl(
                shaders::swarm_kernels(groups.accumulate, groups.integrate).into(),
            ),
        });

        let pipeline = |entry: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let accumulate = pipeline("accumulate");
        let integrate = pipeline("integrate");
        let fused = pipeline("fused");

        let shader_error = pollster::block_on(device.pop_error_scope());
        let resource_error = pollster::block_on(device.pop_error_scope());
        if let Some(err) = shader_error {
            return Err(GpuError::ShaderBuild(err.to_string()));
        }
        if let Some(err) = resource_error {
            return Err(GpuError::ResourceBuild(err.to_string()));
        }

        tracing::info!(
            agents = agent_count,
            slots,
            accumulate_group = groups.accumulate,
            integrate_group = groups.integrate,
            "GPU swarm kernels built"
        );

        Ok(Self {
            device,
            queue: ctx.queue.clone(),
            agent_count,
            groups,
            ring,
            params_buffer,
            agents,
            _forces: forces,
            staging,
            bind_groups,
            accumulate,
            integrate,
            fused,
        })
    }

    /// Generation buffer for `slot`, usable as an instance vertex buffer.
    pub fn agent_buffer(&self, slot: Slot) -> Option<&wgpu::Buffer> {
        self.agents.get(slot.index())
    }

    fn check_slot(&self, slot: Slot) -> Result<(), BackendError> {
        if slot.index() >= self.agents.len() {
            return Err(BackendError::SlotOutOfRange {
                slot: slot.index(),
                count: self.agents.len(),
            });
        }
        Ok(())
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ParamsUniform>() as u64),
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn agent_count(&self) -> usize {
        self.agent_count
    }

    fn slot_count(&self) -> usize {
        self.agents.len()
    }

    fn upload_params(&mut self, params: &SwarmParams) -> Result<(), BackendError> {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params.to_uniform()));
        Ok(())
    }

    fn upload_population(&mut self, agents: &[Agent]) -> Result<(), BackendError> {
        if agents.len() != self.agent_count {
            return Err(BackendError::PopulationMismatch {
                expected: self.agent_count,
                actual: agents.len(),
            });
        }
        for buffer in &self.agents {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(agents));
        }
        Ok(())
    }

    fn dispatch(&mut self, plan: &FramePlan) -> Result<(), BackendError> {
        self.check_slot(plan.read)?;
        self.check_slot(plan.write)?;
        if plan.read == plan.write {
            return Err(BackendError::AliasedSlots(plan.read.index()));
        }
        let paired = self.ring.write_slot(plan.read.index() as u64);
        if plan.write != paired {
            return Err(BackendError::Device(format!(
                "no bind group pairs read slot {} with write slot {}",
                plan.read.index(),
                plan.write.index()
            )));
        }
        let bind_group = &self.bind_groups[plan.read.index()];

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("swarm_frame"),
            });
        for stage in plan.stages() {
            let (pipeline, size, label) = match stage {
                Stage::Accumulate => (&self.accumulate, self.groups.accumulate, "accumulate"),
                Stage::Integrate => (&self.integrate, self.groups.integrate, "integrate"),
                Stage::Fused => (&self.fused, self.groups.integrate, "fused"),
            };
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(group_count(self.agent_count, size), 1, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_population(&mut self, slot: Slot) -> Result<Vec<Agent>, BackendError> {
        self.check_slot(slot)?;
        let size = self.agent_count as u64 * AGENT_SIZE;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("agents_readback"),
            });
        encoder.copy_buffer_to_buffer(&self.agents[slot.index()], 0, &self.staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| BackendError::Readback(e.to_string()))?
            .map_err(|e| BackendError::Readback(e.to_string()))?;

        let agents = {
            let data = slice.get_mapped_range();
            data.chunks_exact(AGENT_SIZE as usize)
                .map(bytemuck::pod_read_unaligned::<Agent>)
                .collect()
        };
        self.staging.unmap();
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use pps_common::SwarmParams;
    use pps_kernel::{StageVariant, step_population};

    #[test]
    fn buffer_strides_match_host_records() {
        assert_eq!(AGENT_SIZE, 16);
        assert_eq!(FORCE_SIZE, 8);
        assert_eq!(std::mem::size_of::<ParamsUniform>(), 16);
    }

    #[test]
    fn build_errors_name_their_stage() {
        let shader = GpuError::ShaderBuild("bad entry point".into()).to_string();
        let resource = GpuError::ResourceBuild("zero-sized buffer".into()).to_string();
        assert!(shader.starts_with("shader or pipeline build failed"));
        assert!(resource.starts_with("buffer or bind group creation failed"));
    }

    // Runs only where an adapter is available.
    #[test]
    fn build_failures_are_classified() {
        let Ok(ctx) = GpuContext::headless() else {
            return;
        };
        assert!(matches!(
            GpuBackend::new(&ctx, 0, 2, GroupSizes::default()),
            Err(GpuError::ResourceBuild(_))
        ));
        let zero_group = GroupSizes {
            accumulate: 0,
            ..GroupSizes::default()
        };
        assert!(matches!(
            GpuBackend::new(&ctx, 8, 2, zero_group),
            Err(GpuError::ShaderBuild(_))
        ));
        assert!(GpuBackend::new(&ctx, 8, 2, GroupSizes::default()).is_ok());
    }

    // Runs only where an adapter is available.
    #[test]
    fn gpu_frame_matches_cpu_step() {
        let Ok(ctx) = GpuContext::headless() else {
            return;
        };
        let agents = vec![
            Agent::new(Vec2::new(0.0, 0.0), std::f32::consts::FRAC_PI_2),
            Agent::new(Vec2::new(0.05, 0.0), std::f32::consts::FRAC_PI_2),
            Agent::new(Vec2::new(-0.6, 0.7), 2.0),
        ];
        let params = SwarmParams::new(0.01, 0.1, 0.05, 0.1);
        let mut backend = GpuBackend::new(&ctx, agents.len(), 2, GroupSizes::default()).unwrap();
        backend.upload_params(&params).unwrap();
        backend.upload_population(&agents).unwrap();

        let ring = PingPong::new(2).unwrap();
        for variant in [StageVariant::TwoPass, StageVariant::SinglePass] {
            let plan = FramePlan {
                read: ring.read_slot(0),
                write: ring.write_slot(0),
                variant,
            };
            backend.dispatch(&plan).unwrap();
            let gpu = backend.read_population(plan.write).unwrap();
            let cpu = step_population(&agents, &params, variant);
            for (g, c) in gpu.iter().zip(&cpu) {
                assert!((g.position[0] - c.position[0]).abs() < 1e-4);
                assert!((g.position[1] - c.position[1]).abs() < 1e-4);
                assert!((g.heading - c.heading).abs() < 1e-4);
                assert_eq!(g.reserved, c.reserved);
            }
        }
    }
}
