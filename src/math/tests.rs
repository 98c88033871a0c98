// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::constants::PI;

#[test]
fn test_cexp() {
    let c = cexp(PI);
    assert_abs_diff_eq!(c.re, -1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(c.im, 0.0, epsilon = 1e-12);
}

#[test]
fn test_mean_and_median() {
    assert_abs_diff_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
    assert_abs_diff_eq!(median(&[6.0, 1.0, 2.0]), 2.0);
    assert_abs_diff_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    assert!(mean(&[]).is_nan());
    assert!(median(&[]).is_nan());
}

#[test]
fn test_complex_median_sorts_by_magnitude() {
    let values = [
        Complex::new(3.0, 0.0),
        Complex::new(0.0, -1.0),
        Complex::new(0.0, 2.0),
    ];
    let m = complex_median(&values);
    assert_abs_diff_eq!(m.re, 0.0);
    assert_abs_diff_eq!(m.im, 2.0);

    let values = [Complex::new(1.0, 0.0), Complex::new(3.0, 0.0)];
    let m = complex_median(&values);
    assert_abs_diff_eq!(m.re, 2.0);

    let m = complex_mean(&[Complex::new(1.0, 1.0), Complex::new(3.0, -1.0)]);
    assert_abs_diff_eq!(m.re, 2.0);
    assert_abs_diff_eq!(m.im, 0.0);
}

#[test]
fn test_smallest_phase_difference() {
    assert_abs_diff_eq!(smallest_phase_difference(170.0, -170.0, 360.0), 20.0);
    assert_abs_diff_eq!(smallest_phase_difference(-170.0, 170.0, 360.0), -20.0);
    assert_abs_diff_eq!(smallest_phase_difference(0.1, 0.3, TAU), 0.2, epsilon = 1e-12);
}

#[test]
fn test_wrap_phase() {
    assert_abs_diff_eq!(wrap_phase(190.0, 360.0), -170.0);
    assert_abs_diff_eq!(wrap_phase(-190.0, 360.0), 170.0);
    assert_abs_diff_eq!(wrap_phase(180.0, 360.0), 180.0);
    assert_abs_diff_eq!(wrap_phase(-180.0, 360.0), -180.0);
    assert_abs_diff_eq!(wrap_phase(3.0 * PI, TAU), PI, epsilon = 1e-12);
}

#[test]
fn test_range_tracker_ignores_nan() {
    let mut r = RangeTracker::default();
    assert_eq!(r.finish(), (0.0, 0.0));
    r.update(f32::NAN);
    assert_eq!(r.finish(), (0.0, 0.0));
    r.update(2.0);
    r.update(-1.0);
    r.update(f32::NAN);
    assert_eq!(r.finish(), (-1.0, 2.0));

    let mut other = RangeTracker::default();
    other.update(5.0);
    r.merge(&other);
    assert_eq!(r.finish(), (-1.0, 5.0));
}
