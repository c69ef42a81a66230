use glam::Vec2;
use lasso_core::config::{DrawConfig, PhysicsConfig, ShrinkConfig, ShrinkStrategy};
use lasso_core::obstacle::{Layers, Obstacle, ObstacleField, ObstacleRef};
use lasso_core::rope::{RopeId, RopeWorld};
use wasm_bindgen::prelude::*;

/// Render-side vertex: 8 bytes per rope point, tightly packed.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RenderPoint {
    position: [f32; 2],
}

fn to_js_error(err: lasso_core::RopeError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct LassoWorld {
    world: RopeWorld,
    obstacles: ObstacleField,
    render_buffer: Vec<RenderPoint>,
    /// Start offset of each rope in `render_buffer`, plus one trailing end offset.
    offsets: Vec<u32>,
}

#[wasm_bindgen]
impl LassoWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(cell_size: f32) -> Result<LassoWorld, JsValue> {
        let world = RopeWorld::new(PhysicsConfig::default(), ShrinkConfig::default(), DrawConfig::default())
            .map_err(to_js_error)?;
        web_sys::console::log_1(&format!("WASM LassoWorld created: cell size {}", cell_size).into());

        let mut lasso = LassoWorld {
            world,
            obstacles: ObstacleField::new(cell_size),
            render_buffer: Vec::new(),
            offsets: vec![0],
        };
        lasso.write_render_output();
        Ok(lasso)
    }

    #[wasm_bindgen]
    pub fn add_circle(&mut self, x: f32, y: f32, radius: f32, layers: u32) -> u32 {
        let layers = Layers::from_bits_truncate(layers);
        self.obstacles.insert(Obstacle::circle(Vec2::new(x, y), radius, layers)).0
    }

    #[wasm_bindgen]
    pub fn add_box(&mut self, x: f32, y: f32, half_width: f32, half_height: f32, layers: u32) -> u32 {
        let layers = Layers::from_bits_truncate(layers);
        let half_extents = Vec2::new(half_width, half_height);
        self.obstacles.insert(Obstacle::rect(Vec2::new(x, y), half_extents, layers)).0
    }

    #[wasm_bindgen]
    pub fn move_obstacle(&mut self, handle: u32, x: f32, y: f32) -> bool {
        self.obstacles.set_position(ObstacleRef(handle), Vec2::new(x, y))
    }

    #[wasm_bindgen]
    pub fn remove_obstacle(&mut self, handle: u32) -> bool {
        self.obstacles.remove(ObstacleRef(handle)).is_some()
    }

    #[wasm_bindgen]
    pub fn begin_stroke(&mut self, x: f32, y: f32) -> Result<(), JsValue> {
        self.world.begin_stroke(Vec2::new(x, y)).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn extend_stroke(&mut self, x: f32, y: f32) -> Result<u32, JsValue> {
        self.world
            .extend_stroke(Vec2::new(x, y))
            .map(|added| added as u32)
            .map_err(to_js_error)
    }

    /// Returns the new rope id, or -1 when the stroke was too short.
    #[wasm_bindgen]
    pub fn end_stroke(&mut self) -> Result<i32, JsValue> {
        let created = self.world.end_stroke(&self.obstacles).map_err(to_js_error)?;
        self.write_render_output();
        Ok(created.map_or(-1, |RopeId(id)| id as i32))
    }

    #[wasm_bindgen]
    pub fn cancel_stroke(&mut self) {
        self.world.cancel_stroke();
    }

    #[wasm_bindgen]
    pub fn stroke_point_count(&self) -> usize {
        self.world.stroke().map_or(0, |s| s.len())
    }

    /// Fixed-step the whole world. Returns wall time spent in milliseconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f32) -> f32 {
        let start = js_sys::Date::now();
        self.world.step(&self.obstacles, dt);
        self.write_render_output();
        let elapsed = js_sys::Date::now() - start;
        elapsed as f32
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.world.reset();
        self.write_render_output();
        web_sys::console::log_1(&"WASM LassoWorld reset".into());
    }

    #[wasm_bindgen]
    pub fn get_render_buffer_ptr(&self) -> *const f32 {
        self.render_buffer.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn get_render_buffer_byte_length(&self) -> usize {
        self.render_buffer.len() * std::mem::size_of::<RenderPoint>()
    }

    /// Copy of the render buffer as `[x0, y0, x1, y1, ...]`.
    #[wasm_bindgen]
    pub fn positions(&self) -> Vec<f32> {
        bytemuck::cast_slice(&self.render_buffer).to_vec()
    }

    /// Point offsets of each rope into the render buffer; length is `rope_count + 1`.
    #[wasm_bindgen]
    pub fn rope_offsets(&self) -> Vec<u32> {
        self.offsets.clone()
    }

    #[wasm_bindgen]
    pub fn rope_count(&self) -> usize {
        self.world.len()
    }

    #[wasm_bindgen]
    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    /// Shrink state code per rope (0 idle .. 7 finished).
    #[wasm_bindgen]
    pub fn rope_states(&self) -> Vec<u32> {
        self.world.ropes().iter().map(|r| r.state().code()).collect()
    }

    /// Strategy for ropes created after this call. Unknown codes are rejected.
    #[wasm_bindgen]
    pub fn set_strategy(&mut self, strategy: u8) -> Result<(), JsValue> {
        let strategy = ShrinkStrategy::from_u8(strategy)
            .ok_or_else(|| JsValue::from_str(&format!("unknown shrink strategy {}", strategy)))?;
        let config = self.world.shrink_config().clone().with_strategy(strategy);
        self.world.set_shrink_config(config).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_shrink_params(&mut self, shrink_rate: f32, min_segment_length: f32, delay: f32) -> Result<(), JsValue> {
        let config = self
            .world
            .shrink_config()
            .clone()
            .with_shrink_rate(shrink_rate)
            .with_min_segment_length(min_segment_length)
            .with_shrink_delay(delay);
        self.world.set_shrink_config(config).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_physics_params(
        &mut self,
        gravity_x: f32,
        gravity_y: f32,
        damping: f32,
        collision_radius: f32,
    ) -> Result<(), JsValue> {
        let config = self
            .world
            .physics_config()
            .clone()
            .with_gravity(Vec2::new(gravity_x, gravity_y))
            .with_damping(damping)
            .with_collision_radius(collision_radius);
        self.world.set_physics_config(config).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_iteration_budget(
        &mut self,
        runs: u32,
        runs_high: u32,
        frequency: u32,
        frequency_high: u32,
    ) -> Result<(), JsValue> {
        let config = self
            .world
            .physics_config()
            .clone()
            .with_constraint_runs(runs, runs_high)
            .with_collision_frequency(frequency, frequency_high);
        self.world.set_physics_config(config).map_err(to_js_error)
    }
}

impl LassoWorld {
    fn write_render_output(&mut self) {
        self.render_buffer.clear();
        self.offsets.clear();
        self.offsets.push(0);
        for rope in self.world.ropes() {
            self.render_buffer.extend(rope.chain().segments.iter().map(|s| RenderPoint {
                position: s.position.to_array(),
            }));
            self.offsets.push(self.render_buffer.len() as u32);
        }
    }
}
