//! Blend-in curve shapes.
//!
//! Each option remaps a linear blend percentage in [0, 1] onto a weight in [0, 1]. All
//! shapes are monotonic and fix both endpoints, so they change perceived speed but
//! never the total blend duration.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum BlendOption {
    #[default]
    Linear,
    Cubic,
    HermiteCubic,
    Sinusoidal,
    QuadraticInOut,
    CubicInOut,
    QuarticInOut,
    QuinticInOut,
    CircularIn,
    CircularOut,
    CircularInOut,
    ExpIn,
    ExpOut,
    ExpInOut,
    /// Cubic-bezier timing with control points (x1, y1, x2, y2).
    Bezier([f32; 4]),
}

impl BlendOption {
    /// Map a linear percentage onto this curve. Input is clamped to [0, 1].
    pub fn alpha(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let out = match *self {
            BlendOption::Linear => t,
            // Hermite with zero end tangents; the two only differ in name.
            BlendOption::Cubic | BlendOption::HermiteCubic => t * t * (3.0 - 2.0 * t),
            BlendOption::Sinusoidal => ((t * PI - PI * 0.5).sin() + 1.0) * 0.5,
            BlendOption::QuadraticInOut => ease_in_out(t, 2),
            BlendOption::CubicInOut => ease_in_out(t, 3),
            BlendOption::QuarticInOut => ease_in_out(t, 4),
            BlendOption::QuinticInOut => ease_in_out(t, 5),
            BlendOption::CircularIn => circular_in(t),
            BlendOption::CircularOut => circular_out(t),
            BlendOption::CircularInOut => {
                if t < 0.5 {
                    0.5 * circular_in(t * 2.0)
                } else {
                    0.5 * circular_out(t * 2.0 - 1.0) + 0.5
                }
            }
            BlendOption::ExpIn => exp_in(t),
            BlendOption::ExpOut => exp_out(t),
            BlendOption::ExpInOut => {
                if t < 0.5 {
                    0.5 * exp_in(t * 2.0)
                } else {
                    0.5 * exp_out(t * 2.0 - 1.0) + 0.5
                }
            }
            BlendOption::Bezier([x1, y1, x2, y2]) => bezier_ease(t, x1, y1, x2, y2),
        };
        out.clamp(0.0, 1.0)
    }
}

#[inline]
fn ease_in_out(t: f32, exp: i32) -> f32 {
    if t < 0.5 {
        0.5 * (2.0 * t).powi(exp)
    } else {
        1.0 - 0.5 * (2.0 * (1.0 - t)).powi(exp)
    }
}

#[inline]
fn circular_in(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

#[inline]
fn circular_out(t: f32) -> f32 {
    let u = t - 1.0;
    (1.0 - u * u).max(0.0).sqrt()
}

#[inline]
fn exp_in(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else {
        2f32.powf(10.0 * (t - 1.0))
    }
}

#[inline]
fn exp_out(t: f32) -> f32 {
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2f32.powf(-10.0 * t)
    }
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Invert the x bezier by bisection, then evaluate y.
fn bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if x1 == 0.0 && y1 == 0.0 && x2 == 1.0 && y2 == 1.0 {
        return t;
    }
    let (x1, x2) = (x1.clamp(0.0, 1.0), x2.clamp(0.0, 1.0));
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut mid = t;
    for _ in 0..24 {
        let x = cubic_bezier(0.0, x1, x2, 1.0, mid);
        if (x - t).abs() < 1e-6 {
            break;
        }
        if x < t {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(0.0, y1, y2, 1.0, mid)
}
