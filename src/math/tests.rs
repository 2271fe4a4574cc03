// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::constants::FRAC_PI_2;

#[test]
fn test_cexp() {
    let c = cexp(PI);
    assert_abs_diff_eq!(c.re, -1.0, epsilon = 1e-15);
    assert_abs_diff_eq!(c.im, 0.0, epsilon = 1e-15);

    let c = cexp(FRAC_PI_2);
    assert_abs_diff_eq!(c.re, 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(c.im, 1.0, epsilon = 1e-15);
}

#[test]
fn test_wrap_phase() {
    assert_abs_diff_eq!(wrap_phase(0.0), 0.0);
    assert_abs_diff_eq!(wrap_phase(PI), PI);
    // -π is outside the interval; it maps onto π.
    assert_abs_diff_eq!(wrap_phase(-PI), PI);
    assert_abs_diff_eq!(wrap_phase(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = 1e-12);
    assert_abs_diff_eq!(wrap_phase(-5.0 * TAU + 0.1), 0.1, epsilon = 1e-12);
    assert!(wrap_phase(f64::NAN).is_nan());
    assert!(wrap_phase(f64::INFINITY).is_nan());
}

#[test]
fn test_n_choose_k() {
    assert_eq!(n_choose_k(7, 2), 21);
    assert_eq!(n_choose_k(7, 3), 35);
    assert_eq!(n_choose_k(18, 2), 153);
    assert_eq!(n_choose_k(18, 3), 816);
    assert_eq!(n_choose_k(2, 3), 0);
    assert_eq!(n_choose_k(5, 0), 1);
}

#[test]
fn test_median() {
    assert_eq!(median(&[]), None);
    assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    assert_eq!(median(&[f64::NAN, 1.0, 3.0]), Some(2.0));
}

#[test]
fn test_median_and_sigma() {
    let (centre, sigma) = median_and_sigma(&[1.0, 1.0, 1.0, 1.0]).unwrap();
    assert_abs_diff_eq!(centre, 1.0);
    assert_abs_diff_eq!(sigma, 0.0);

    let (centre, sigma) = median_and_sigma(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
    assert_abs_diff_eq!(centre, 3.0);
    assert_abs_diff_eq!(sigma, MAD_TO_SIGMA * 1.0);
}

#[test]
fn test_mean_and_std_err() {
    let (mean, err) = mean_and_std_err(&[1.0, 2.0, 3.0, 4.0]);
    assert_abs_diff_eq!(mean, 2.5);
    // Sample variance is 5/3.
    assert_abs_diff_eq!(err, (5.0 / 3.0 / 4.0_f64).sqrt(), epsilon = 1e-15);

    let (mean, err) = mean_and_std_err(&[7.0]);
    assert_abs_diff_eq!(mean, 7.0);
    assert!(err.is_nan());
}
