//! Hardware backend: Instance/Adapter/Device/Queue plus the window surface.

use std::sync::{Arc, Mutex};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use crate::coords::{SurfaceSize, Viewport};
use crate::error::{RenderError, RenderResult};
use crate::render::{
    align_up, CompiledShader, CompiledStage, FillMode, RasterDesc, RenderCtx, RenderTarget,
    Vertex, CONSTANTS_SIZE,
};

use super::surface::{choose_alpha_mode, choose_present_mode, choose_surface_format};
use super::{DeviceInit, GraphicsBackend, Pass, PresentationSurface, WgpuTarget};

/// Uniform buffers never shrink below this many slots.
const MIN_UNIFORM_SLOTS: u64 = 64;

pub struct WgpuRaster {
    primitive: wgpu::PrimitiveState,
}

pub struct WgpuProgram {
    label: String,
    vertex: wgpu::ShaderModule,
    /// `None` when both stages live in the vertex module.
    fragment: Option<wgpu::ShaderModule>,
    vertex_entry: String,
    fragment_entry: String,
}

pub struct WgpuPipeline {
    pipeline: wgpu::RenderPipeline,
}

pub struct WgpuGeometry {
    buffer: wgpu::Buffer,
}

pub struct WgpuUniforms {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
    slot_stride: u64,
}

/// Owns wgpu core objects and the presentation surface.
///
/// Fields drop in declaration order: the surface goes before the device it was
/// configured with, and the instance goes last.
pub struct WgpuBackend<'w> {
    surface: PresentationSurface<'w>,
    fallback_uniforms: WgpuUniforms,
    uniform_layout: wgpu::BindGroupLayout,
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::Adapter,
    #[allow(dead_code)]
    instance: wgpu::Instance,

    /// Set from the device-lost callback; checked before every frame operation.
    device_lost: Arc<Mutex<Option<String>>>,
}

impl<'w> WgpuBackend<'w> {
    /// Creates a hardware device and a surface bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new<W>(window: &'w W, size: SurfaceSize, init: DeviceInit) -> RenderResult<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync,
    {
        if size.is_empty() {
            return Err(RenderError::DeviceCreation(
                "window has zero size".to_string(),
            ));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Surface lifetime is tied to `window` via `'w`.
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::DeviceCreation(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::DeviceCreation(format!("no suitable adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("poppingball device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::DeviceCreation(format!("failed to create device: {e}")))?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let device_lost = Arc::new(Mutex::new(None));
        let lost_slot = Arc::clone(&device_lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("device lost ({reason:?}): {message}");
            if let Ok(mut slot) = lost_slot.lock() {
                *slot = Some(format!("{reason:?}: {message}"));
            }
        });

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb).ok_or_else(|| {
            RenderError::DeviceCreation("no supported surface formats".to_string())
        })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: choose_present_mode(&caps.present_modes, 1),
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        log::debug!("surface {format:?} {}x{}", size.width, size.height);

        let surface = PresentationSurface::new(surface, &caps, config, size);
        surface.configure(&device);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("poppingball constants bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(CONSTANTS_SIZE),
                },
                count: None,
            }],
        });

        // Zeroed constants for draws made while no uniform buffer exists.
        let stride = uniform_stride(&device);
        let fallback_uniforms = make_uniforms(&device, &uniform_layout, stride, 1);

        Ok(Self {
            surface,
            fallback_uniforms,
            uniform_layout,
            device,
            queue,
            adapter,
            instance,
            device_lost,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface.format()
    }

    fn check_device(&self) -> RenderResult<()> {
        match self.device_lost.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(msg) => Err(RenderError::DeviceLost(msg.clone())),
                None => Ok(()),
            },
            Err(_) => Err(RenderError::DeviceLost(
                "device-lost state poisoned".to_string(),
            )),
        }
    }

    /// Records `draw` into its own encoder on top of `target` and submits it.
    pub(crate) fn record_overlay<F>(
        &mut self,
        target: &WgpuTarget,
        viewport: Viewport,
        draw: F,
    ) -> RenderResult<()>
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>),
    {
        self.check_device()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("poppingball overlay encoder"),
            });

        let ctx = RenderCtx::new(&self.device, &self.queue, self.surface.format(), viewport);
        let mut rt = RenderTarget::new(&mut encoder, &target.view);
        draw(&ctx, &mut rt);

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl<'w> GraphicsBackend for WgpuBackend<'w> {
    type Target = WgpuTarget;
    type Raster = WgpuRaster;
    type Program = WgpuProgram;
    type Pipeline = WgpuPipeline;
    type Geometry = WgpuGeometry;
    type Uniforms = WgpuUniforms;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn surface_size(&self) -> SurfaceSize {
        self.surface.size()
    }

    fn uniform_alignment(&self) -> u64 {
        u64::from(self.device.limits().min_uniform_buffer_offset_alignment)
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.surface.resize(&self.device, size);
    }

    fn acquire_target(&mut self) -> RenderResult<WgpuTarget> {
        self.check_device()?;
        self.surface.acquire_render_target(&self.device)
    }

    fn target_size(&self, target: &WgpuTarget) -> SurfaceSize {
        target.size
    }

    fn create_raster(&mut self, desc: &RasterDesc) -> RenderResult<WgpuRaster> {
        if desc.fill == FillMode::Wireframe
            && !self.device.features().contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            return Err(RenderError::resource(
                "rasterizer state",
                "wireframe fill requires POLYGON_MODE_LINE",
            ));
        }

        Ok(WgpuRaster {
            primitive: desc.primitive_state(),
        })
    }

    fn create_program(&mut self, shader: &CompiledShader) -> RenderResult<WgpuProgram> {
        let module = |stage: &CompiledStage| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&stage.label),
                    source: wgpu::ShaderSource::Wgsl(stage.code.as_str().into()),
                })
        };

        let vertex = module(&shader.vertex);
        let fragment = if shader.fragment.code == shader.vertex.code {
            None
        } else {
            Some(module(&shader.fragment))
        };

        Ok(WgpuProgram {
            label: shader.vertex.label.clone(),
            vertex,
            fragment,
            vertex_entry: shader.vertex.entry_point.clone(),
            fragment_entry: shader.fragment.entry_point.clone(),
        })
    }

    fn link_pipeline(
        &mut self,
        program: &WgpuProgram,
        raster: &WgpuRaster,
    ) -> RenderResult<WgpuPipeline> {
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("poppingball shape pipeline layout"),
                bind_group_layouts: &[&self.uniform_layout],
                immediate_size: 0,
            });

        let label = format!("{} pipeline", program.label);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(&program.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: program.fragment.as_ref().unwrap_or(&program.vertex),
                    entry_point: Some(&program.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface.format(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: raster.primitive,
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        Ok(WgpuPipeline { pipeline })
    }

    fn create_geometry(&mut self, label: &str, bytes: &[u8]) -> RenderResult<WgpuGeometry> {
        if bytes.is_empty() {
            return Err(RenderError::resource("vertex buffer", "no vertex data"));
        }
        let max = self.device.limits().max_buffer_size;
        if bytes.len() as u64 > max {
            return Err(RenderError::resource(
                "vertex buffer",
                format!("{} bytes exceeds device limit {max}", bytes.len()),
            ));
        }

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::VERTEX,
            });

        Ok(WgpuGeometry { buffer })
    }

    fn create_uniforms(&mut self, slot_stride: u64, slots: u64) -> RenderResult<WgpuUniforms> {
        if slot_stride < CONSTANTS_SIZE || slot_stride % self.uniform_alignment() != 0 {
            return Err(RenderError::resource(
                "constants buffer",
                format!("slot stride {slot_stride} is not a valid uniform offset"),
            ));
        }
        Ok(make_uniforms(
            &self.device,
            &self.uniform_layout,
            slot_stride,
            slots.max(MIN_UNIFORM_SLOTS),
        ))
    }

    fn write_uniforms(&mut self, uniforms: &mut WgpuUniforms, bytes: &[u8]) -> RenderResult<()> {
        self.check_device()?;

        let needed = bytes.len() as u64;
        if needed > uniforms.capacity {
            let slots = needed
                .div_ceil(uniforms.slot_stride)
                .next_power_of_two()
                .max(MIN_UNIFORM_SLOTS);
            log::debug!("growing constants buffer to {slots} slots");
            *uniforms = make_uniforms(
                &self.device,
                &self.uniform_layout,
                uniforms.slot_stride,
                slots,
            );
        }

        if !bytes.is_empty() {
            self.queue.write_buffer(&uniforms.buffer, 0, bytes);
        }
        Ok(())
    }

    fn execute(&mut self, target: &mut WgpuTarget, pass: &Pass<'_, Self>) -> RenderResult<()> {
        self.check_device()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("poppingball frame encoder"),
            });

        {
            let load = match pass.clear {
                Some(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
                None => wgpu::LoadOp::Load,
            };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("poppingball shape pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let vp = pass.viewport;
            rpass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);

            if let Some(pipeline) = pass.pipeline {
                rpass.set_pipeline(&pipeline.pipeline);

                let (uniforms, use_offsets) = match pass.uniforms {
                    Some(u) => (u, true),
                    None => (&self.fallback_uniforms, false),
                };

                for draw in pass.draws {
                    let offset = if use_offsets {
                        draw.uniform_offset.unwrap_or(0)
                    } else {
                        0
                    };
                    rpass.set_bind_group(0, &uniforms.bind_group, &[offset]);
                    rpass.set_vertex_buffer(0, draw.geometry.buffer.slice(..));
                    rpass.draw(0..draw.vertex_count, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&mut self, target: WgpuTarget, vsync_intervals: u32) -> RenderResult<()> {
        self.check_device()?;

        let WgpuTarget {
            surface_texture,
            view,
            ..
        } = target;
        drop(view);
        surface_texture.present();

        // The surface may only be reconfigured once no back buffer is held.
        self.surface.apply_vsync(&self.device, vsync_intervals);
        Ok(())
    }

    fn flush(&mut self) {
        if let Err(e) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("flush before release failed: {e}");
        }
    }
}

fn uniform_stride(device: &wgpu::Device) -> u64 {
    let align = u64::from(device.limits().min_uniform_buffer_offset_alignment);
    align_up(CONSTANTS_SIZE, align)
}

fn make_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slot_stride: u64,
    slots: u64,
) -> WgpuUniforms {
    let capacity = slot_stride * slots;

    // Zero-initialized by wgpu.
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("poppingball constants"),
        size: capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("poppingball constants bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(CONSTANTS_SIZE),
            }),
        }],
    });

    WgpuUniforms {
        buffer,
        bind_group,
        capacity,
        slot_stride,
    }
}
