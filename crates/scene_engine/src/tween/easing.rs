//! Easing curves
//!
//! Every curve maps normalized time in `[0, 1]` to progress in `[0, 1]`.
//! Inputs outside the range are clamped, so the end points are exact for
//! every curve.

use std::f32::consts::{FRAC_PI_2, PI};

/// Shape of a tween's progress over time
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuarticIn,
    QuarticOut,
    QuarticInOut,
    QuinticIn,
    QuinticOut,
    QuinticInOut,
    SinusoidalIn,
    SinusoidalOut,
    SinusoidalInOut,
    ExponentialIn,
    ExponentialOut,
    ExponentialInOut,
    CircularIn,
    CircularOut,
    CircularInOut,
}

impl Easing {
    /// Every curve
    pub const ALL: [Self; 22] = [
        Self::Linear,
        Self::QuadraticIn,
        Self::QuadraticOut,
        Self::QuadraticInOut,
        Self::CubicIn,
        Self::CubicOut,
        Self::CubicInOut,
        Self::QuarticIn,
        Self::QuarticOut,
        Self::QuarticInOut,
        Self::QuinticIn,
        Self::QuinticOut,
        Self::QuinticInOut,
        Self::SinusoidalIn,
        Self::SinusoidalOut,
        Self::SinusoidalInOut,
        Self::ExponentialIn,
        Self::ExponentialOut,
        Self::ExponentialInOut,
        Self::CircularIn,
        Self::CircularOut,
        Self::CircularInOut,
    ];

    /// Progress at normalized time `t`
    pub fn apply(self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Self::Linear => t,
            Self::QuadraticIn => power_in(t, 2),
            Self::QuadraticOut => power_out(t, 2),
            Self::QuadraticInOut => in_out(t, |t| power_in(t, 2)),
            Self::CubicIn => power_in(t, 3),
            Self::CubicOut => power_out(t, 3),
            Self::CubicInOut => in_out(t, |t| power_in(t, 3)),
            Self::QuarticIn => power_in(t, 4),
            Self::QuarticOut => power_out(t, 4),
            Self::QuarticInOut => in_out(t, |t| power_in(t, 4)),
            Self::QuinticIn => power_in(t, 5),
            Self::QuinticOut => power_out(t, 5),
            Self::QuinticInOut => in_out(t, |t| power_in(t, 5)),
            Self::SinusoidalIn => 1.0 - (t * FRAC_PI_2).cos(),
            Self::SinusoidalOut => (t * FRAC_PI_2).sin(),
            Self::SinusoidalInOut => -0.5 * ((PI * t).cos() - 1.0),
            Self::ExponentialIn => exponential_in(t),
            Self::ExponentialOut => 1.0 - exponential_in(1.0 - t),
            Self::ExponentialInOut => in_out(t, exponential_in),
            Self::CircularIn => circular_in(t),
            Self::CircularOut => 1.0 - circular_in(1.0 - t),
            Self::CircularInOut => in_out(t, circular_in),
        }
    }
}

fn power_in(t: f32, power: i32) -> f32 {
    t.powi(power)
}

fn power_out(t: f32, power: i32) -> f32 {
    1.0 - (1.0 - t).powi(power)
}

fn exponential_in(t: f32) -> f32 {
    2.0_f32.powf(10.0 * (t - 1.0))
}

fn circular_in(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

/// First half runs `ease_in`, second half its mirror
fn in_out(t: f32, ease_in: impl Fn(f32) -> f32) -> f32 {
    if t < 0.5 {
        0.5 * ease_in(t * 2.0)
    } else {
        1.0 - 0.5 * ease_in((1.0 - t) * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_every_curve_hits_end_points_and_is_monotonic() {
        for easing in Easing::ALL {
            assert_relative_eq!(easing.apply(0.0), 0.0);
            assert_relative_eq!(easing.apply(1.0), 1.0);

            let mut previous = 0.0;
            for step in 1..=20 {
                let value = easing.apply(step as f32 / 20.0);
                assert!(value + 1e-6 >= previous, "{easing:?} decreased at step {step}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_in_out_curves_are_symmetric_around_midpoint() {
        for easing in [Easing::QuadraticInOut, Easing::CubicInOut, Easing::SinusoidalInOut] {
            assert_relative_eq!(easing.apply(0.5), 0.5, epsilon = 1e-5);
            assert_relative_eq!(easing.apply(0.25) + easing.apply(0.75), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_known_values() {
        assert_relative_eq!(Easing::QuadraticIn.apply(0.5), 0.25);
        assert_relative_eq!(Easing::QuadraticOut.apply(0.5), 0.75);
        assert_relative_eq!(Easing::CubicIn.apply(0.5), 0.125);
        assert_relative_eq!(Easing::SinusoidalOut.apply(0.5), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
    }
}
