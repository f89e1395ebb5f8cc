//! Accelerator path: the same leapfrog step as compute dispatches on a wgpu device.
//!
//! Records live in a storage buffer with the exact 16-float layout of
//! [`Body`], so the buffer can be bound as vertex data without reordering.
//! Moving data between host and device goes through [`GpuIntegrator::upload`]
//! and [`GpuIntegrator::download`]; a download blocks until the device has
//! finished every submitted step and copies the whole buffer back.

use anyhow::{Context, anyhow, bail};
use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;
use log::{debug, info};
use pollster::FutureExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, CommandEncoder, ComputePipeline, Device,
    VertexAttribute, VertexBufferLayout, util::DeviceExt,
};

use crate::{
    bodies::BodyBuffer,
    body::{Body, FLOATS_PER_BODY},
    config::SimConfig,
    constants::WORKGROUP_SIZE,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct StepParams {
    count: u32,
    half_dt: f32,
    dt: f32,
    eps2: f32,
}

impl Body {
    /// `(pos, mass)` at location 0 and `color` at location 1, one record per vertex.
    pub const fn vertex_layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Body>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 0,
                },
                VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 4 * std::mem::size_of::<f32>() as u64,
                    shader_location: 1,
                },
            ],
        }
    }
}

pub struct GpuContext {
    pub device: Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn new() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .context("Failed to find an appropriate adapter")?;
        info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("nbody device"),
                ..Default::default()
            })
            .await?;

        Ok(Self { device, queue })
    }

    pub fn new_blocking() -> anyhow::Result<Self> {
        Self::new().block_on()
    }
}

/// Device-resident body buffer and the three pipelines of one step.
pub struct GpuIntegrator {
    ctx: GpuContext,
    len: usize,
    workgroups: u32,
    params: StepParams,
    bodies: Buffer,
    carried: Buffer,
    params_buffer: Buffer,
    staging: Buffer,
    carried_staging: Buffer,
    bind_group: BindGroup,
    kick_drift: ComputePipeline,
    accumulate: ComputePipeline,
    kick_settle: ComputePipeline,
    primed: bool,
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("step bind group layout"),
        entries: &[
            storage_entry(0),
            storage_entry(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

impl GpuIntegrator {
    pub fn new(ctx: GpuContext, config: &SimConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let device = &ctx.device;
        let len = config.body_count;
        let bodies_size = (len * std::mem::size_of::<Body>()) as u64;
        let carried_size = (len * std::mem::size_of::<[f32; 4]>()) as u64;

        let bodies = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bodies"),
            size: bodies_size,
            usage: BufferUsages::STORAGE
                | BufferUsages::VERTEX
                | BufferUsages::COPY_SRC
                | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let carried = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("carried accelerations"),
            size: carried_size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bodies staging"),
            size: bodies_size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let carried_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("carried staging"),
            size: carried_size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params = StepParams {
            count: len as u32,
            half_dt: 0.5 * config.dt,
            dt: config.dt,
            eps2: config.softening * config.softening,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("step params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        let layout = create_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("step bind group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: bodies.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: carried.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("step.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("step.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("step pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let kick_drift = pipeline("kick_drift");
        let accumulate = pipeline("accumulate");
        let kick_settle = pipeline("kick_settle");

        Ok(Self {
            workgroups: len.div_ceil(WORKGROUP_SIZE) as u32,
            ctx,
            len,
            params,
            bodies,
            carried,
            params_buffer,
            staging,
            carried_staging,
            bind_group,
            kick_drift,
            accumulate,
            kick_settle,
            primed: false,
        })
    }

    /// The device buffer holding the records, for binding as vertex data.
    pub fn bodies_buffer(&self) -> &Buffer {
        &self.bodies
    }

    /// Copy host records (and carried accelerations, if any) to the device.
    pub fn upload(&mut self, bodies: &BodyBuffer) -> anyhow::Result<()> {
        if bodies.len() != self.len {
            bail!(
                "buffer holds {} bodies, device buffer holds {}",
                bodies.len(),
                self.len
            );
        }
        self.ctx
            .queue
            .write_buffer(&self.bodies, 0, bodies.as_bytes());
        match bodies.carried() {
            Some(carried) => {
                let padded = carried
                    .iter()
                    .map(|a| [a.x, a.y, a.z, 0.0])
                    .collect::<Vec<[f32; 4]>>();
                self.ctx
                    .queue
                    .write_buffer(&self.carried, 0, bytemuck::cast_slice(&padded));
                self.primed = true;
            }
            None => self.primed = false,
        }
        debug!("Uploaded {} bodies", self.len);
        Ok(())
    }

    fn dispatch(&self, encoder: &mut CommandEncoder, pipeline: &ComputePipeline, label: &str) {
        // One pass per stage; the pass boundary orders the storage writes.
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.workgroups, 1, 1);
    }

    fn encoder(&self) -> CommandEncoder {
        self.ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None })
    }

    fn prime(&mut self) {
        let prime = StepParams {
            half_dt: 0.0,
            ..self.params
        };
        self.ctx
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&prime));
        let mut encoder = self.encoder();
        self.dispatch(&mut encoder, &self.accumulate, "prime accumulate");
        self.dispatch(&mut encoder, &self.kick_settle, "prime settle");
        self.ctx.queue.submit(Some(encoder.finish()));
        self.ctx
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
        self.primed = true;
    }

    /// Submit `steps` leapfrog steps. Does not wait for completion.
    pub fn step(&mut self, steps: u64) {
        if !self.primed {
            self.prime();
        }
        let mut encoder = self.encoder();
        for _ in 0..steps {
            self.dispatch(&mut encoder, &self.kick_drift, "kick drift");
            self.dispatch(&mut encoder, &self.accumulate, "accumulate");
            self.dispatch(&mut encoder, &self.kick_settle, "kick settle");
        }
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    fn read_back(&self, source: &Buffer, staging: &Buffer) -> anyhow::Result<Vec<u8>> {
        let mut encoder = self.encoder();
        encoder.copy_buffer_to_buffer(source, 0, staging, 0, staging.size());
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.device.poll(wgpu::PollType::Wait)?;
        rx.block_on()
            .map_err(|_| anyhow!("buffer mapping was cancelled"))??;

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }

    /// Block until every submitted step is done and copy the device state back
    /// into `bodies`.
    pub fn download(&self, bodies: &mut BodyBuffer) -> anyhow::Result<()> {
        let records = self.read_back(&self.bodies, &self.staging)?;
        bodies.import_bytes(&records)?;
        debug_assert_eq!(records.len(), self.len * FLOATS_PER_BODY * 4);

        if self.primed {
            let carried = self.read_back(&self.carried, &self.carried_staging)?;
            let carried = carried
                .chunks_exact(std::mem::size_of::<[f32; 4]>())
                .map(|c| {
                    let v: [f32; 4] = bytemuck::pod_read_unaligned(c);
                    Vector3::new(v[0], v[1], v[2])
                })
                .collect::<Vec<_>>();
            bodies.set_carried(carried);
        }
        Ok(())
    }
}
