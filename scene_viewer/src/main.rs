//! Scene viewer
//!
//! Renders a hardcoded scene: a ground plane and a ring of cubes that share
//! one mesh, drawn in a single indirect call. WASD/QE move the camera, the
//! arrow keys turn it, R spins the ring, T toggles a plain material over
//! every instance and Escape quits.

use std::path::{Path, PathBuf};

use glfw::Key;
use vulkan_engine::config::Config;
use vulkan_engine::foundation::math::compose_transform;
use vulkan_engine::prelude::*;
use vulkan_engine::render::managers::DEFAULT_TEXTURE_INDEX;

const CONFIG_FILE: &str = "scene_viewer.toml";
const RING_CUBES: usize = 8;
const RING_RADIUS: f32 = 3.0;
const FPS_LOG_INTERVAL: u64 = 600;

fn resource(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn default_config() -> RendererConfig {
    let shader = |name: &str| resource(&format!("target/shaders/{name}")).display().to_string();
    RendererConfig::new("Scene Viewer")
        .with_window(WindowConfig {
            title: "Vulkan Engine - Scene Viewer".to_string(),
            width: 1280,
            height: 720,
        })
        .with_shaders(ShaderConfig::new(shader("scene.vert.spv"), shader("scene.frag.spv")))
}

struct SceneViewerApp {
    // Renderer must drop before the window that owns the surface
    renderer: Renderer,
    window: Window,
    controller: FlyCameraController,
    cubes: Vec<(ModelHandle, f32)>,
    spin: f32,
    toggle_held: bool,
    timer: Timer,
}

impl SceneViewerApp {
    fn new(config: &RendererConfig) -> EngineResult<Self> {
        let mut window = Window::new(&config.window)?;
        let renderer = Renderer::new(&mut window, config)?;

        Ok(Self {
            renderer,
            window,
            controller: FlyCameraController::new(4.0, 1.5),
            cubes: Vec::new(),
            spin: 0.0,
            toggle_held: false,
            timer: Timer::new(),
        })
    }

    fn build_scene(&mut self) -> EngineResult<()> {
        let cube = resource("resources/models/cube.obj");
        let ground = resource("resources/models/ground.obj");
        let checker = resource("resources/textures/checker.png");

        self.renderer
            .add_model(&ground, None::<&Path>, Mat4::new_translation(&Vec3::new(0.0, -0.5, 0.0)))?;

        for i in 0..RING_CUBES {
            let angle = i as f32 / RING_CUBES as f32 * std::f32::consts::TAU;
            let handle = self.renderer.add_model(&cube, Some(&checker), Self::ring_transform(angle, 0.0))?;
            self.cubes.push((handle, angle));
        }
        self.renderer.add_model(&cube, None::<&Path>, Mat4::new_scaling(1.5))?;

        self.renderer
            .set_light(DirectionalLight::new(Vec3::new(-0.5, -1.0, -0.4), Vec3::new(1.0, 0.97, 0.9), 1.2));
        self.renderer.upload_scene()?;
        Ok(())
    }

    fn ring_transform(angle: f32, spin: f32) -> Mat4 {
        compose_transform(
            Vec3::new(angle.cos() * RING_RADIUS, 0.0, angle.sin() * RING_RADIUS),
            Vec3::new(0.0, spin + angle, 0.0),
            Vec3::new(0.6, 0.6, 0.6),
        )
    }

    /// Turn the ring; every change re-uploads the instance stream
    fn spin_ring(&mut self, dt: f32) -> EngineResult<()> {
        self.spin += dt;
        for &(handle, angle) in &self.cubes {
            self.renderer
                .set_instance_transform(handle, Self::ring_transform(angle, self.spin))?;
        }
        Ok(())
    }

    /// Flip the material override on the press edge of T
    fn toggle_material(&mut self, held: bool) -> EngineResult<()> {
        if held && !self.toggle_held {
            let next = match self.renderer.material_override() {
                Some(_) => None,
                None => Some(DEFAULT_TEXTURE_INDEX),
            };
            self.renderer.set_material_override(next)?;
            log::info!("Material override: {next:?}");
        }
        self.toggle_held = held;
        Ok(())
    }

    fn run(&mut self) -> EngineResult<()> {
        self.build_scene()?;
        log::info!("Entering render loop");

        while !self.window.should_close() {
            self.window.poll_events();
            self.timer.update();
            let input = self.window.current_input().clone();
            if input.is_key_pressed(Key::Escape) {
                self.window.set_should_close(true);
                continue;
            }

            let dt = self.timer.delta_time();
            self.controller.update(self.renderer.camera_mut(), &input, dt);

            if input.is_key_pressed(Key::R) {
                self.spin_ring(dt)?;
            }
            self.toggle_material(input.is_key_pressed(Key::T))?;

            match self.renderer.draw_frame(&mut self.window)? {
                FrameOutcome::Presented => {}
                FrameOutcome::SkippedSwapchainRecreated => log::debug!("Frame skipped for swapchain recreation"),
                FrameOutcome::SkippedMinimized => self.window.wait_events(),
            }

            if self.timer.frame_count() % FPS_LOG_INTERVAL == 0 {
                log::debug!("Average FPS: {:.1}", self.timer.average_fps());
            }
        }

        self.renderer.wait_idle()?;
        log::info!("Render loop finished after {} frames", self.renderer.frame_number());
        Ok(())
    }
}

fn load_config() -> EngineResult<RendererConfig> {
    let config = if Path::new(CONFIG_FILE).exists() {
        RendererConfig::load_from_file(CONFIG_FILE)?
    } else {
        default_config()
    };
    config.validate()?;
    Ok(config)
}

fn main() {
    vulkan_engine::foundation::logging::init();

    let result = load_config().and_then(|config| SceneViewerApp::new(&config)?.run());
    if let Err(e) = result {
        log::error!("Scene viewer failed: {e}");
        std::process::exit(1);
    }
}
