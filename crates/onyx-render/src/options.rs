use std::f32::consts::{PI, TAU};

/// Shape parameters of a circle or arc.
///
/// Angles are in radians, measured counter-clockwise from the local X axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleOptions {
    pub inner_fade: f32,
    pub outer_fade: f32,
    /// 0 draws a disk, values towards 1 hollow it into a ring.
    pub hollowness: f32,
    pub lower_angle: f32,
    pub upper_angle: f32,
}

impl Default for CircleOptions {
    fn default() -> Self {
        Self {
            inner_fade: 0.0,
            outer_fade: 0.0,
            hollowness: 0.0,
            lower_angle: 0.0,
            upper_angle: TAU,
        }
    }
}

impl CircleOptions {
    pub fn arc(lower_angle: f32, upper_angle: f32) -> Self {
        Self {
            lower_angle,
            upper_angle,
            ..Default::default()
        }
    }

    pub fn with_hollowness(mut self, hollowness: f32) -> Self {
        self.hollowness = hollowness;
        self
    }

    pub fn with_fades(mut self, inner_fade: f32, outer_fade: f32) -> Self {
        self.inner_fade = inner_fade;
        self.outer_fade = outer_fade;
        self
    }

    /// Whether the arc spans more than half a turn.
    pub fn angle_overflow(&self) -> bool {
        (self.upper_angle - self.lower_angle).abs() > PI
    }
}

/// Parameters of [`RenderContext::axes`](crate::RenderContext::axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesOptions {
    pub thickness: f32,
    /// Length of each axis line.
    pub size: f32,
}

impl Default for AxesOptions {
    fn default() -> Self {
        Self {
            thickness: 0.1,
            size: 50.0,
        }
    }
}
