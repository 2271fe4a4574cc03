// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! (De)serialisation of floats that may be NaN. JSON has no NaN, so these are
//! written as `null` and read back as NaN.

use ndarray::Array2;
use num_complex::Complex64;
use serde::{de::Error, Deserialize, Deserializer, Serializer};

fn to_option(x: f64) -> Option<f64> {
    if x.is_finite() {
        Some(x)
    } else {
        None
    }
}

fn from_option(x: Option<f64>) -> f64 {
    x.unwrap_or(f64::NAN)
}

fn c64_to_options(c: &Complex64) -> [Option<f64>; 2] {
    [to_option(c.re), to_option(c.im)]
}

fn c64_from_options([re, im]: [Option<f64>; 2]) -> Complex64 {
    Complex64::new(from_option(re), from_option(im))
}

pub(super) mod f64_value {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
        match to_option(*x) {
            Some(x) => s.serialize_some(&x),
            None => s.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Option::<f64>::deserialize(d).map(from_option)
    }
}

pub(super) mod vec_f64 {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(|&x| to_option(x)))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let v = Vec::<Option<f64>>::deserialize(d)?;
        Ok(v.into_iter().map(from_option).collect())
    }
}

pub(super) mod vec_c64 {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(v: &[Complex64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(c64_to_options))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Complex64>, D::Error> {
        let v = Vec::<[Option<f64>; 2]>::deserialize(d)?;
        Ok(v.into_iter().map(c64_from_options).collect())
    }
}

/// Arrays are written as `[rows, columns, [values...]]`.
pub(super) mod array2_f64 {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(a: &Array2<f64>, s: S) -> Result<S::Ok, S::Error> {
        let (rows, cols) = a.dim();
        let data: Vec<Option<f64>> = a.iter().map(|&x| to_option(x)).collect();
        s.collect_seq([
            serde_json::json!(rows),
            serde_json::json!(cols),
            serde_json::json!(data),
        ])
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Array2<f64>, D::Error> {
        let (rows, cols, data) = <(usize, usize, Vec<Option<f64>>)>::deserialize(d)?;
        Array2::from_shape_vec((rows, cols), data.into_iter().map(from_option).collect())
            .map_err(D::Error::custom)
    }
}

pub(super) mod array2_c64 {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(a: &Array2<Complex64>, s: S) -> Result<S::Ok, S::Error> {
        let (rows, cols) = a.dim();
        let data: Vec<[Option<f64>; 2]> = a.iter().map(c64_to_options).collect();
        s.collect_seq([
            serde_json::json!(rows),
            serde_json::json!(cols),
            serde_json::json!(data),
        ])
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Array2<Complex64>, D::Error> {
        let (rows, cols, data) = <(usize, usize, Vec<[Option<f64>; 2]>)>::deserialize(d)?;
        Array2::from_shape_vec((rows, cols), data.into_iter().map(c64_from_options).collect())
            .map_err(D::Error::custom)
    }
}
