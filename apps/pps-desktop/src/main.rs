use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use pps_common::{PRESETS, ParamName, SwarmParams};
use pps_control::{CommandInbox, InteractionController, channel};
use pps_gpu::{AgentPipeline, GpuBackend, GpuContext};
use pps_kernel::{SimConfig, Simulation};
use pps_tools::SwarmInspector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "pps-desktop", about = "Particle swarm desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML or JSON run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Named parameter set to start from
    #[arg(short, long)]
    preset: Option<String>,
}

/// UI-side state. The simulation itself lives next to the GPU objects.
struct AppState {
    config: SimConfig,
    controller: InteractionController,
    inbox: CommandInbox,
    /// Slider values; edits are sent through the controller.
    params: SwarmParams,
    show_panel: bool,
    paused: bool,
    last_error: Option<String>,
    last_frame: Instant,
    frame_ms: f32,
}

impl AppState {
    fn new(config: SimConfig) -> Self {
        let (controller, inbox) = channel();
        Self {
            params: config.params,
            config,
            controller,
            inbox,
            show_panel: true,
            paused: false,
            last_error: None,
            last_frame: Instant::now(),
            frame_ms: 0.0,
        }
    }

    fn report<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        if let Err(e) = result {
            tracing::warn!("rejected: {e}");
            self.last_error = Some(e.to_string());
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::KeyR => {
                let r = self.controller.reset();
                self.report(r);
            }
            KeyCode::KeyX => {
                let r = self.controller.randomize_and_reset();
                self.report(r);
            }
            KeyCode::Space => {
                self.paused = !self.paused;
            }
            KeyCode::F1 => {
                self.show_panel = !self.show_panel;
            }
            _ => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext, sim: &mut Simulation<GpuBackend>) {
        // keep sliders in sync with randomize/preset results
        self.params = sim.params();
        if !self.show_panel {
            return;
        }

        egui::SidePanel::left("parameters")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Particle Swarm");
                ui.separator();
                ui.label(format!(
                    "Generation: {}  Agents: {}",
                    sim.generation(),
                    self.config.agent_count
                ));
                ui.label(format!("Variant: {}", self.config.variant));
                ui.label(format!("Frame: {:.2} ms", self.frame_ms));
                ui.separator();

                ui.heading("Parameters");
                for name in ParamName::ALL {
                    let mut value = self.params.get(name);
                    let changed = ui
                        .add(
                            egui::Slider::new(&mut value, name.slider_range())
                                .text(name.label())
                                .max_decimals(3),
                        )
                        .changed();
                    if changed {
                        let r = self.controller.set_parameter(name, value);
                        self.report(r);
                    }
                }

                ui.separator();
                ui.heading("Presets");
                ui.horizontal_wrapped(|ui| {
                    for (preset, _) in PRESETS {
                        if ui.button(*preset).clicked() {
                            let r = self.controller.apply_preset(preset);
                            self.report(r);
                        }
                    }
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Reset (R)").clicked() {
                        let r = self.controller.reset();
                        self.report(r);
                    }
                    if ui.button("Randomize (X)").clicked() {
                        let r = self.controller.randomize_and_reset();
                        self.report(r);
                    }
                });
                let label = if self.paused { "Resume (Space)" } else { "Pause (Space)" };
                if ui.button(label).clicked() {
                    self.paused = !self.paused;
                }

                if ui.button("Inspect generation").clicked() {
                    match sim.population() {
                        Ok(agents) => {
                            let summary =
                                SwarmInspector::summary(&agents, &sim.params(), sim.generation());
                            tracing::info!("{summary}");
                        }
                        Err(e) => self.last_error = Some(e.to_string()),
                    }
                }

                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }

                ui.separator();
                ui.small("F1: Toggle Panel | R: Reset | X: Randomize | Space: Pause");
            });
    }
}

/// Everything that only exists once the window is up.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    ctx: GpuContext,
    config: wgpu::SurfaceConfiguration,
    sim: Simulation<GpuBackend>,
    pipeline: AgentPipeline,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(config: SimConfig) -> Self {
        Self {
            state: AppState::new(config),
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("Particle Swarm")
            .with_inner_size(PhysicalSize::new(1024u32, 1024));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(pps_gpu::GpuError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("pps_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;
        let ctx = GpuContext::from_parts(Arc::new(device), Arc::new(queue));

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &config);

        let sim_config = self.state.config.clone();
        let backend = GpuBackend::new(
            &ctx,
            sim_config.agent_count,
            sim_config.buffer_count,
            sim_config.group_sizes(),
        )?;
        let mut sim = Simulation::new(backend, sim_config)?;
        sim.initialize()?;

        let pipeline = AgentPipeline::new(&ctx.device, surface_format);
        pipeline.resize(&ctx.queue, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&ctx.device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Gpu {
            window,
            surface,
            ctx,
            config,
            sim,
            pipeline,
            egui_winit,
            egui_renderer,
        })
    }
}

impl Gpu {
    /// Apply queued commands, advance one generation, draw it, then the panel.
    fn frame(&mut self, state: &mut AppState, egui_ctx: &EguiContext) {
        if let Err(e) = state.inbox.apply_pending(&mut self.sim) {
            tracing::warn!("command failed: {e}");
            state.last_error = Some(e.to_string());
        }
        if !state.paused {
            if let Err(e) = self.sim.run_frame() {
                tracing::error!("frame failed: {e}");
                state.last_error = Some(e.to_string());
            }
        }

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.ctx.device, &self.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let slot = self.sim.exposed_slot();
        if let Some(agents) = self.sim.backend().agent_buffer(slot) {
            self.pipeline.render(
                device,
                queue,
                &view,
                agents,
                state.config.agent_count as u32,
            );
        }

        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let full_output = egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx, &mut self.sim);
        });

        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        self.egui_renderer.update_buffers(
            device,
            queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                tracing::error!("failed to start: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.config.width = new_size.width.max(1);
                gpu.config.height = new_size.height.max(1);
                gpu.surface.configure(&gpu.ctx.device, &gpu.config);
                gpu.pipeline
                    .resize(&gpu.ctx.queue, gpu.config.width, gpu.config.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.state.handle_key(key);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                self.state.frame_ms = (now - self.state.last_frame).as_secs_f32() * 1000.0;
                self.state.last_frame = now;

                gpu.frame(&mut self.state, &self.egui_ctx);
                gpu.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(name) = &cli.preset {
        config.params = SwarmParams::preset(name)?;
    }
    config.validate()?;

    tracing::info!(agents = config.agent_count, "pps-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
