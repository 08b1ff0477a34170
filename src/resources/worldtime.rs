/// Simulation clock owned by a scene.
///
/// The host passes the unscaled frame delta to `Scene::update`; the clock
/// applies `time_scale` and keeps the scaled values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub time_scale: f32,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(time_scale: f32) -> Self {
        WorldTime {
            time_scale,
            ..Self::default()
        }
    }

    /// Advances one frame by `dt` unscaled seconds.
    pub fn advance(&mut self, dt: f32) {
        let scaled_dt = dt * self.time_scale;
        self.elapsed += scaled_dt;
        self.delta = scaled_dt;
        self.frame_count += 1;
    }
}
