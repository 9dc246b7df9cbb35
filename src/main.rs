// =============================================================================
// HELLO TRIANGLE - rhi demo
// =============================================================================
//
// A rotating triangle drawn through the handle-based API. The backend and
// window settings come from config.toml.
//
// FRAME FLOW (inside FrameLoop::render_frame):
// 1. Wait for the frame slot's fence
// 2. Acquire a swapchain image (recreating once if out of date)
// 3. Record: update the slot's uniform buffer, draw into the image
// 4. Submit, then present
//
// =============================================================================

use anyhow::{bail, Result};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use rhi::config::Config;
use rhi::util::load_spirv;
use rhi::*;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting hello_triangle");
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.fullscreen { "fullscreen" } else { "windowed" }
    );
    log::info!(
        "Backend: {}, present mode: {}",
        config.graphics.backend,
        config.graphics.present_mode
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Initialize logging, creating the log file when enabled
fn init_logging(config: &Config) {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::from_default_env();
    builder.filter_level(LevelFilter::Info);
    builder.init();

    if config.debug.log_to_file {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            let _ = writeln!(file, "=== hello_triangle log ===");
            let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file);
        }
    }
}

// =============================================================================
// SCENE DATA
// =============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

const VERTICES: [Vertex; 3] = [
    Vertex {
        position: [0.0, -0.6],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [0.6, 0.6],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [-0.6, 0.6],
        color: [0.0, 0.0, 1.0],
    },
];

/// Radians per second
const ROTATION_SPEED: f32 = 0.8;

// =============================================================================
// RENDERER
// =============================================================================

/// Everything created from the GPU API.
///
/// IMPORTANT: Field order matters for Drop! Scene resources go first, then
/// the frame loop (which owns the device), then the surface and instance.
struct Renderer {
    // ─────────────────────────────────────────────────────────────────────────
    // SCENE
    // ─────────────────────────────────────────────────────────────────────────
    /// One uniform buffer and bind group per frame in flight
    bind_groups: Vec<BindGroup>,
    uniform_buffers: Vec<Buffer>,
    vertex_buffer: Buffer,
    pipeline: GraphicsPipeline,
    _pipeline_layout: PipelineLayout,
    _bind_group_layout: BindGroupLayout,
    _vertex_shader: ShaderModule,
    _fragment_shader: ShaderModule,

    // ─────────────────────────────────────────────────────────────────────────
    // PRESENTATION
    // ─────────────────────────────────────────────────────────────────────────
    frame_loop: FrameLoop,
    _surface: Surface,
    _adapter: Adapter,
    _instance: Instance,
    _api: Arc<dyn GraphicsApi>,
}

impl Renderer {
    fn new(config: &Config, window: &Window) -> Result<Self> {
        let api = create_graphics_api(config.backend())?;
        let mut instance = api.create_instance(&InstanceOptions {
            application_name: config.window.title.clone(),
            enable_validation: config.debug.validation_layers,
            ..Default::default()
        });
        if !instance.is_valid() {
            bail!("Instance creation failed");
        }

        let surface = instance.create_surface(&SurfaceOptions::from_window(window)?);
        if !surface.is_valid() {
            bail!("Surface creation failed");
        }

        let AdapterAndDevice { adapter, device } =
            instance.create_default_device(&surface, AdapterDeviceType::DiscreteGpu)?;

        let size = window.inner_size();
        let mut frame_loop = FrameLoop::new(
            device,
            &adapter,
            &surface,
            &FrameLoopOptions {
                extent: Extent2D {
                    width: size.width,
                    height: size.height,
                },
                frames_in_flight: config.graphics.max_frames_in_flight,
                present_mode: config.present_mode(),
                ..Default::default()
            },
        )?;

        let device = frame_loop.device();
        let vertex_shader = device.create_shader_module(&load_spirv(&config.shaders.vertex)?);
        let fragment_shader = device.create_shader_module(&load_spirv(&config.shaders.fragment)?);
        if !vertex_shader.is_valid() || !fragment_shader.is_valid() {
            bail!("Shader module creation failed");
        }

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutOptions {
            bindings: vec![ResourceBindingLayout::new(
                0,
                ResourceBindingType::UniformBuffer,
                ShaderStageFlags::VERTEX,
            )],
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutOptions {
            bind_group_layouts: vec![bind_group_layout.handle()],
            ..Default::default()
        });

        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineOptions {
            shader_stages: vec![
                ShaderStage::new(vertex_shader.handle(), ShaderStageFlags::VERTEX),
                ShaderStage::new(fragment_shader.handle(), ShaderStageFlags::FRAGMENT),
            ],
            layout: pipeline_layout.handle(),
            vertex: VertexOptions {
                buffers: vec![VertexBufferLayout {
                    binding: 0,
                    stride: std::mem::size_of::<Vertex>() as u32,
                    input_rate: VertexRate::Vertex,
                }],
                attributes: vec![
                    VertexAttribute {
                        location: 0,
                        binding: 0,
                        format: Format::R32G32Sfloat,
                        offset: 0,
                    },
                    VertexAttribute {
                        location: 1,
                        binding: 0,
                        format: Format::R32G32B32Sfloat,
                        offset: 8,
                    },
                ],
            },
            render_targets: vec![RenderTargetOptions {
                format: frame_loop.format(),
                blending_enabled: false,
            }],
            primitive: PrimitiveOptions {
                cull_mode: CullMode::None,
                ..Default::default()
            },
            ..Default::default()
        });
        if !pipeline.is_valid() {
            bail!("Graphics pipeline creation failed");
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&VERTICES);
        let vertex_buffer = device.create_buffer(&BufferOptions {
            size: vertex_bytes.len() as DeviceSize,
            usage: BufferUsageFlags::VERTEX_BUFFER | BufferUsageFlags::TRANSFER_DST,
            memory_usage: MemoryUsage::GpuOnly,
        });

        let transform_size = std::mem::size_of::<[f32; 16]>() as DeviceSize;
        let mut uniform_buffers = Vec::new();
        let mut bind_groups = Vec::new();
        for _ in 0..frame_loop.frames_in_flight() {
            let buffer = device.create_buffer(&BufferOptions {
                size: transform_size,
                usage: BufferUsageFlags::UNIFORM_BUFFER,
                memory_usage: MemoryUsage::CpuToGpu,
            });
            bind_groups.push(device.create_bind_group(&BindGroupOptions {
                layout: bind_group_layout.handle(),
                resources: vec![BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::uniform_buffer(buffer.handle()),
                }],
            }));
            uniform_buffers.push(buffer);
        }

        frame_loop.upload_buffer_data(&BufferUploadOptions {
            destination_buffer: vertex_buffer.handle(),
            dst_offset: 0,
            dst_stages: PipelineStageFlags::VERTEX_INPUT,
            dst_mask: AccessFlags::VERTEX_ATTRIBUTE_READ,
            data: vertex_bytes,
        })?;

        log::info!("Renderer ready");

        Ok(Self {
            bind_groups,
            uniform_buffers,
            vertex_buffer,
            pipeline,
            _pipeline_layout: pipeline_layout,
            _bind_group_layout: bind_group_layout,
            _vertex_shader: vertex_shader,
            _fragment_shader: fragment_shader,
            frame_loop,
            _surface: surface,
            _adapter: adapter,
            _instance: instance,
            _api: api,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.frame_loop.resize(Extent2D { width, height });
    }

    /// Returns true if a frame was presented
    fn render(&mut self, angle: f32, clear_color: [f32; 4]) -> Result<bool> {
        let Self {
            bind_groups,
            uniform_buffers,
            vertex_buffer,
            pipeline,
            frame_loop,
            ..
        } = self;

        let outcome = frame_loop.render_frame(|recorder, target| {
            let slot = target.in_flight_index;
            let aspect = target.extent.width as f32 / target.extent.height.max(1) as f32;
            let transform = Mat4::from_scale(glam::Vec3::new(1.0 / aspect.max(1.0), 1.0, 1.0))
                * Mat4::from_rotation_z(angle);
            if let Err(e) = uniform_buffers[slot].write(0, bytemuck::bytes_of(&transform.to_cols_array())) {
                log::error!("Failed to update transform: {}", e);
            }

            let mut pass = recorder.begin_render_pass(&RenderPassCommandRecorderOptions {
                color_attachments: vec![ColorAttachment {
                    view: target.color_view.handle(),
                    clear_value: clear_color,
                    ..Default::default()
                }],
                ..Default::default()
            });
            pass.set_pipeline(pipeline);
            pass.set_viewport(&Viewport::from_extent(target.extent));
            pass.set_scissor(&Rect2D {
                offset: Offset2D::default(),
                extent: target.extent,
            });
            pass.set_vertex_buffer(0, vertex_buffer, 0);
            pass.set_bind_group(0, &bind_groups[slot]);
            pass.draw(&DrawCommand {
                vertex_count: VERTICES.len() as u32,
                ..Default::default()
            });
            pass.end();
        })?;

        Ok(matches!(outcome, FrameOutcome::Presented { .. }))
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Scene resources are dropped before the frame loop gets to wait
        if let Err(e) = self.frame_loop.device().wait_until_idle() {
            log::warn!("wait_until_idle before cleanup failed: {}", e);
        }
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    // Renderer before window: the surface must go before the window it targets
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    is_fullscreen: bool,

    start_time: Instant,
    frame_count: u32,
    last_fps_update: Instant,
    last_frame_time: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        let is_fullscreen = config.window.fullscreen;
        let now = Instant::now();
        Self {
            config,
            renderer: None,
            window: None,
            is_fullscreen,
            start_time: now,
            frame_count: 0,
            last_fps_update: now,
            last_frame_time: now,
        }
    }

    fn toggle_fullscreen(&mut self) {
        if let Some(ref window) = self.window {
            self.is_fullscreen = !self.is_fullscreen;

            if self.is_fullscreen {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                log::info!("Entered fullscreen mode");
            } else {
                window.set_fullscreen(None);
                log::info!("Exited fullscreen mode");
            }
        }
    }

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        // Update title every second
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;

            if let Some(ref window) = self.window {
                window.set_title(&format!(
                    "{} - {:.0} FPS ({:.2}ms)",
                    self.config.window.title,
                    fps,
                    frame_time * 1000.0
                ));
            }

            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let angle = self.start_time.elapsed().as_secs_f32() * ROTATION_SPEED;

        match renderer.render(angle, self.config.graphics.clear_color) {
            Ok(true) => self.update_fps(),
            Ok(false) => {}
            Err(e) => {
                log::error!("Render error: {:#}", e);
                if matches!(e.downcast_ref::<GpuError>(), Some(GpuError::DeviceLost)) {
                    event_loop.exit();
                }
            }
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        if self.config.window.fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&self.config, &window) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                log::error!("Failed to initialize renderer: {:#}", e);
                event_loop.exit();
                return;
            }
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            // A zero size (minimized) pauses rendering until the next resize
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        match key {
                            KeyCode::Escape => {
                                log::info!("ESC pressed, exiting...");
                                event_loop.exit();
                            }
                            KeyCode::F11 => self.toggle_fullscreen(),
                            _ => {}
                        }
                    }
                }
            }

            _ => {}
        }
    }

    /// Request continuous redraws
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Cleaning up GPU resources...");
        self.renderer = None;
    }
}
