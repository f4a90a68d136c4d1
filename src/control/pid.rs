use crate::{
    constants::{DEFAULT_KP, DEFAULT_TD, DEFAULT_TDLPF},
    rect::{Rect, F4},
};

/// Controller gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    /// Proportional gain, applied to the integral path
    pub kp: f32,
    /// Time constant of the low-pass filtered error, in seconds
    pub tdlpf: f32,
    /// Weight of the filtered error in the output (`Td × Kp`)
    pub klpf: f32,
}

impl Gains {
    /// Build gains from the user-facing `Kp`, `Td` and `Tdlpf` settings
    #[must_use]
    pub fn from_settings(kp: f32, td: f32, tdlpf: f32) -> Self {
        Self {
            kp,
            tdlpf,
            klpf: td * kp,
        }
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::from_settings(DEFAULT_KP, DEFAULT_TD, DEFAULT_TDLPF)
    }
}

/// Integrates the aggregated error into the crop rectangle
#[derive(Debug, Clone, Default)]
pub struct CropController {
    integral: F4,
    lpf: F4,
    gains: Gains,
}

impl CropController {
    #[must_use]
    pub fn new(gains: Gains) -> Self {
        Self {
            integral: F4::ZERO,
            lpf: F4::ZERO,
            gains,
        }
    }

    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    #[must_use]
    pub const fn gains(&self) -> Gains {
        self.gains
    }

    /// Integral accumulator, in crop coordinates
    #[must_use]
    pub const fn integral(&self) -> F4 {
        self.integral
    }

    /// Low-pass filtered error
    #[must_use]
    pub const fn filtered_error(&self) -> F4 {
        self.lpf
    }

    /// Restart from the full frame
    pub fn reset(&mut self, width: u32, height: u32) -> Rect {
        let full = Rect::full_frame(width, height);
        self.integral = F4::from(full);
        self.lpf = F4::ZERO;
        full
    }

    /// Advance by `second` with error `e` and return the new crop.
    ///
    /// The result always lies inside the frame, has positive size and is
    /// never smaller than the frame divided by `scale_max` in either axis.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn update(&mut self, e: F4, second: f32, width: u32, height: u32, scale_max: f32) -> Rect {
        let gains = self.gains;
        self.integral += e * (second * gains.kp);
        let denom = gains.tdlpf + second;
        if denom > 0.0 {
            self.lpf = (self.lpf * gains.tdlpf + e * second) * (1.0 / denom);
        }
        let mut u = self.integral + self.lpf * gains.klpf;

        if !u.is_finite() {
            return self.reset(width, height);
        }

        let fw = width as f32;
        let fh = height as f32;
        let scale_max = scale_max.max(1.0);
        let min_w = fw / scale_max;
        let min_h = fh / scale_max;
        let range_min = F4::new(0.0, 0.0, min_w, min_h);
        let range_max = F4::new(fw - min_w, fh - min_h, fw, fh);

        for i in 0..4 {
            if u[i] < range_min[i] {
                u[i] = range_min[i];
                self.integral[i] = self.integral[i].max(range_min[i]);
            } else if u[i] > range_max[i] {
                u[i] = range_max[i];
                self.integral[i] = self.integral[i].min(range_max[i]);
            }
        }

        // Corners can still cross each other; hold a minimum span around the centre
        let (x0, x1) = enforce_span(u[0], u[2], min_w, fw);
        let (y0, y1) = enforce_span(u[1], u[3], min_h, fh);

        let (x0, x1) = snap_span(x0, x1, min_w, width as i32);
        let (y0, y1) = snap_span(y0, y1, min_h, height as i32);
        Rect::new(x0, y0, x1, y1, 0.0)
    }
}

fn enforce_span(lo: f32, hi: f32, span: f32, limit: f32) -> (f32, f32) {
    if hi - lo >= span {
        return (lo, hi);
    }
    let centre = (lo + hi) * 0.5;
    let lo = (centre - span * 0.5).clamp(0.0, limit - span);
    (lo, lo + span)
}

/// Truncate to pixels while keeping at least `ceil(span)` pixels inside `[0, limit]`
#[allow(clippy::cast_possible_truncation)]
fn snap_span(lo: f32, hi: f32, span: f32, limit: i32) -> (i32, i32) {
    let min_len = (span.ceil() as i32).clamp(1, limit.max(1));
    let lo = (lo as i32).clamp(0, limit);
    let hi = (hi as i32).clamp(0, limit);
    if hi - lo >= min_len {
        return (lo, hi);
    }
    let hi = (lo + min_len).min(limit);
    (hi - min_len, hi)
}
