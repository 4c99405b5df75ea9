//! Scene viewer driver
//!
//! Builds a small textured scene, renders a few frames into a recording
//! context, releases a texture under a flush budget and picks through the
//! window center.
//!
//! Usage: `scene_viewer [settings.toml|settings.ron]`

use std::rc::Rc;

use scene_engine::foundation::logging;
use scene_engine::gfx::GfxCall;
use scene_engine::prelude::*;
use scene_engine::state::DefaultShaderGenerator;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const FRAMES: usize = 3;

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error("failed to load settings: {0}")]
    Settings(#[from] ConfigError),
    #[error("scene construction failed: {0}")]
    Scene(#[from] SceneError),
    #[error("texture release failed: {0}")]
    Texture(#[from] TextureError),
}

struct Viewer {
    settings: RendererSettings,
    graph: SceneGraph,
    camera: NodeId,
    texture: AttributeRef,
    state: State,
    gl: RecordingContext,
}

impl Viewer {
    fn new(settings: RendererSettings) -> Result<Self, ViewerError> {
        let viewport = Viewport::new(0.0, 0.0, WIDTH, HEIGHT);
        let mut graph = SceneGraph::new();
        let camera = graph.add_camera(Camera {
            view: Mat4d::look_at(Vec3d::new(0.0, 2.0, 10.0), Vec3d::zeros(), Vec3d::y()),
            projection: Mat4d::perspective(std::f64::consts::FRAC_PI_4, viewport.aspect_ratio(), 0.1, 100.0),
            viewport: Some(viewport),
            ..Default::default()
        });
        graph.set_name(camera, "camera")?;

        let texture = AttributeRef::new(Texture::new(PixelFormat::Rgba, 256, 256));
        let mut textured = StateSet::named("textured");
        textured.set_texture_attribute_and_modes(0, texture.clone(), StateMode::ON);
        let textured = Rc::new(textured);

        for (index, x) in [-2.0, 0.0, 2.0].into_iter().enumerate() {
            let transform = graph.add_transform(Mat4d::new_translation(&Vec3d::new(x, 0.0, 0.0)));
            graph.set_name(transform, format!("quad_{index}"))?;
            let quad = graph.add_geometry(quad());
            let tint = [0.3 * index as f32, 0.5, 0.8, 1.0];
            let mut material = StateSet::new();
            material.set_attribute(AttributeRef::new(Material::with_diffuse(tint)));
            graph.set_state_set(quad, Some(Rc::new(material)))?;
            graph.set_state_set(transform, Some(Rc::clone(&textured)))?;
            graph.add_child(camera, transform)?;
            graph.add_child(transform, quad)?;
        }

        let state = State::with_settings(&settings, Box::new(DefaultShaderGenerator::new()));
        log::info!("Scene built with {} nodes", graph.len());

        Ok(Self {
            settings,
            graph,
            camera,
            texture,
            state,
            gl: RecordingContext::new(),
        })
    }

    fn render_frames(&mut self) {
        for frame in 0..FRAMES {
            self.gl.clear();
            let mut stopwatch = Stopwatch::start_new();
            let draws = render_graph(&mut self.state, &mut self.gl, &self.graph, self.camera);
            stopwatch.stop();
            log::info!(
                "Frame {}: {} draws, {} graphics calls, {} binds in {:.3} ms",
                frame,
                draws,
                self.gl.calls().len(),
                self.gl.count(|call| matches!(call, GfxCall::BindTexture(_, Some(_)))),
                stopwatch.elapsed_millis()
            );
        }
    }

    fn release_texture(&mut self) -> Result<(), ViewerError> {
        let textures = self.state.texture_manager_mut();
        if let Some(result) = self
            .texture
            .modify::<Texture, _>(|texture| texture.release_texture_object(textures))
        {
            result?;
        }

        let budget = self.settings.texture_flush_budget_seconds();
        let remaining = self.state.texture_manager_mut().flush_deleted(&mut self.gl, budget);
        log::info!(
            "Flushed {} texture(s), {:.3} ms of budget left",
            self.gl.deleted_textures().len(),
            remaining * 1000.0
        );
        Ok(())
    }

    fn pick_center(&self) {
        let mut picker = IntersectionVisitor::new(LineSegmentIntersector::from_window(WIDTH / 2.0, HEIGHT / 2.0));
        picker.apply(&self.graph, self.camera);

        match picker.intersector().first_hit() {
            Some(hit) => {
                let name = hit
                    .node_path
                    .iter()
                    .rev()
                    .filter_map(|id| self.graph.get(*id))
                    .map(|node| node.name())
                    .find(|name| !name.is_empty())
                    .unwrap_or("<unnamed>");
                log::info!(
                    "Picked {} at {:?} (ratio {:.4}, {} hit(s))",
                    name,
                    hit.world_point(),
                    hit.ratio,
                    picker.intersector().hits().len()
                );
            }
            None => log::info!("Nothing under the window center"),
        }
    }
}

/// Two-triangle quad in the z = 0 plane
fn quad() -> Geometry {
    Geometry::new(
        vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(-0.5, 0.5, 0.0),
        ],
        vec![PrimitiveSet::draw_elements(PrimitiveMode::Triangles, vec![0, 1, 2, 0, 2, 3])],
    )
}

fn run() -> Result<(), ViewerError> {
    let settings = match std::env::args().nth(1) {
        Some(path) => RendererSettings::load_from_file(&path)?,
        None => RendererSettings::default(),
    };
    logging::init_with_filter(&settings.log_filter);
    log::info!("Starting scene viewer with {:?}", settings);

    let mut viewer = Viewer::new(settings)?;
    viewer.render_frames();
    viewer.release_texture()?;
    viewer.pick_center();
    viewer.state.texture_manager().report_stats();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("Scene viewer failed: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
