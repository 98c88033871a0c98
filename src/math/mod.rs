// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use num_complex::Complex;

use crate::constants::TAU;

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
///
/// # Examples
///
/// `assert_abs_diff_eq!(cexp(PI), Complex::new(-1.0, 0.0));`
#[inline]
pub(crate) fn cexp(x: f64) -> Complex<f64> {
    let (im, re) = x.sin_cos();
    Complex::new(re, im)
}

/// The arithmetic mean of the values. An empty slice yields NaN.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// The median of the values (the mean of the two middle values for an even
/// count). NaNs must be removed by the caller. An empty slice yields NaN.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    middle(&sorted, |a, b| (a + b) / 2.0)
}

/// The arithmetic mean of complex values. An empty slice yields NaN.
pub(crate) fn complex_mean(values: &[Complex<f64>]) -> Complex<f64> {
    if values.is_empty() {
        return Complex::new(f64::NAN, f64::NAN);
    }
    values.iter().sum::<Complex<f64>>() / values.len() as f64
}

/// The "median" of complex values: sort by magnitude and take the middle
/// element, or the mean of the two middle elements for an even count.
pub(crate) fn complex_median(values: &[Complex<f64>]) -> Complex<f64> {
    if values.is_empty() {
        return Complex::new(f64::NAN, f64::NAN);
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.norm().partial_cmp(&b.norm()).unwrap_or(Ordering::Equal));
    middle(&sorted, |a, b| (a + b) / 2.0)
}

fn middle<T: Copy>(sorted: &[T], average: impl Fn(T, T) -> T) -> T {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        average(sorted[n / 2 - 1], sorted[n / 2])
    }
}

/// Of `b - a`, `b + turn - a` and `b - turn - a`, return the one with the
/// smallest magnitude. `turn` is 2π for radians or 360 for degrees.
pub(crate) fn smallest_phase_difference(a: f64, b: f64, turn: f64) -> f64 {
    [b - a, b + turn - a, b - turn - a]
        .into_iter()
        .min_by(|x, y| x.abs().partial_cmp(&y.abs()).unwrap_or(Ordering::Equal))
        .unwrap_or(b - a)
}

/// Wrap a phase into `[-turn/2, turn/2]`.
pub(crate) fn wrap_phase(phase: f64, turn: f64) -> f64 {
    let half = turn / 2.0;
    let wrapped = (phase + half).rem_euclid(turn) - half;
    // rem_euclid maps +half onto -half; keep the sign of the input there.
    if wrapped == -half && phase > 0.0 {
        half
    } else {
        wrapped
    }
}

/// The number of turns used for phases in the requested units.
pub(crate) fn phase_turn(degrees: bool) -> f64 {
    if degrees {
        360.0
    } else {
        TAU
    }
}

/// A running min/max tracker that ignores NaN values.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RangeTracker {
    range: Option<(f32, f32)>,
}

impl RangeTracker {
    pub(crate) fn update(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.range = Some(match self.range {
            None => (value, value),
            Some((min, max)) => (min.min(value), max.max(value)),
        });
    }

    pub(crate) fn merge(&mut self, other: &RangeTracker) {
        if let Some((min, max)) = other.range {
            self.update(min);
            self.update(max);
        }
    }

    /// The tracked `(min, max)`; zeros when nothing finite was seen.
    pub(crate) fn finish(&self) -> (f32, f32) {
        self.range.unwrap_or((0.0, 0.0))
    }
}
