// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The built-in catalogue of instruments, their aperture masks and their
//! filters.
//!
//! The catalogue is built once, the first time it is used, and is never
//! mutated afterwards; everything hands out `&'static` references into it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use vec1::{vec1, Vec1};

lazy_static::lazy_static! {
    pub(crate) static ref CATALOG: Catalog = Catalog::builtin();
}

/// All instruments known to the pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Instrument {
    #[strum(serialize = "NIRISS")]
    Niriss,

    #[strum(serialize = "SPHERE")]
    Sphere,

    #[strum(serialize = "SPHERE-IFS")]
    SphereIfs,

    #[strum(serialize = "NACO")]
    Naco,

    #[strum(serialize = "VAMPIRES")]
    Vampires,

    /// Synthetic data. There is no native pixel scale; one must be supplied.
    #[strum(serialize = "SIMULATED")]
    Simulated,
}

/// A named arrangement of sub-apertures.
#[derive(Debug, Clone)]
pub struct MaskDefinition {
    pub name: &'static str,

    /// Sub-aperture centres in the pupil plane \[metres\]. The index of a
    /// coordinate is its aperture ID.
    pub holes: Vec1<[f64; 2]>,

    /// Projected sub-aperture diameter \[metres\].
    pub hole_diameter: f64,
}

/// An observing filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterDefinition {
    pub name: &'static str,

    /// Central wavelength \[metres\].
    pub wavelength: f64,

    /// Full bandwidth \[metres\].
    pub bandwidth: f64,
}

#[derive(Debug, Clone)]
pub struct InstrumentEntry {
    pub telescope: &'static str,

    /// \[milliarcseconds per pixel\]
    pub pixel_scale_mas: Option<f64>,

    pub masks: Vec<MaskDefinition>,

    pub filters: Vec<FilterDefinition>,
}

#[derive(Debug)]
pub struct Catalog {
    entries: BTreeMap<Instrument, InstrumentEntry>,
}

impl Catalog {
    pub fn get(&self, instrument: Instrument) -> Option<&InstrumentEntry> {
        self.entries.get(&instrument)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Instrument, &InstrumentEntry)> {
        self.entries.iter()
    }

    fn builtin() -> Catalog {
        let niriss_g7 = MaskDefinition {
            name: "g7",
            holes: vec1![
                [0.0, -2.64],
                [-2.28631, 0.0],
                [2.28631, -1.32],
                [-2.28631, 1.32],
                [-1.14315, 1.98],
                [2.28631, 1.32],
                [1.14315, 1.98],
            ],
            hole_diameter: 0.8,
        };
        let sphere_g7 = MaskDefinition {
            name: "g7",
            holes: vec1![
                [-1.46, 2.87],
                [1.46, 2.87],
                [-2.92, 0.34],
                [-1.46, -0.51],
                [-2.92, -1.35],
                [2.92, -1.35],
                [0.0, -3.04],
            ],
            hole_diameter: 1.2,
        };
        // The NACO masks are defined at a pupil re-imaging plane; the factor
        // projects them onto the primary mirror.
        let naco_scale = 8.0 / 10.0;
        let naco_g7 = MaskDefinition {
            name: "g7",
            holes: vec1![
                [3.51064, -1.99373],
                [3.51064, 2.49014],
                [1.56907, 1.36918],
                [1.56907, 3.61111],
                [-0.372507, -4.23566],
                [-2.31408, 3.61111],
                [-4.25565, 0.248215],
            ]
            .mapped(|[x, y]| [x * naco_scale, y * naco_scale]),
            hole_diameter: 1.2,
        };
        let naco_g9 = MaskDefinition {
            name: "g9",
            holes: vec1![
                [3.50441, -2.60135],
                [3.50441, 2.00516],
                [2.53020, -2.60135],
                [1.55599, 3.73205],
                [-0.39244, -4.32824],
                [-1.36665, 1.45694],
                [-2.34086, -0.43082],
                [-3.31507, -3.25136],
                [-4.28928, 2.43282],
            ]
            .mapped(|[x, y]| [x * naco_scale, y * naco_scale]),
            hole_diameter: 0.92,
        };
        let naco_bb9 = MaskDefinition {
            name: "bb9",
            holes: vec1![
                [0.8417, -3.7138],
                [2.8917, -2.5302],
                [2.3429, 0.7498],
                [-0.3911, 3.7564],
                [-2.9497, 2.6132],
                [-3.6352, -1.3054],
                [-1.0766, -1.3054],
                [4.0917, 1.6512],
                [-0.3911, 1.1512],
            ]
            .mapped(|[x, y]| [x * naco_scale, y * naco_scale]),
            hole_diameter: 1.59,
        };
        let vampires_g18 = MaskDefinition {
            name: "g18",
            holes: vec1![
                [0.821457, 2.34684],
                [-2.34960, 1.49034],
                [-2.54456, 2.55259],
                [1.64392, 3.04681],
                [2.73751, -0.321102],
                [1.38503, -3.31443],
                [-3.19337, -1.68413],
                [3.05126, 0.560011],
                [-2.76083, 1.14035],
                [3.02564, -0.861342],
                [-0.173798, -3.98154],
                [-2.14378, -2.58521],
                [1.45837, 3.32104],
                [-0.378221, 3.79616],
                [0.286069, -1.33716],
                [-1.53036, -0.131046],
                [1.28012, 0.867117],
                [-0.760937, -2.50637],
            ],
            hole_diameter: 0.162,
        };

        let niriss_filters = vec![
            FilterDefinition {
                name: "F277W",
                wavelength: 2.776e-6,
                bandwidth: 0.715e-6,
            },
            FilterDefinition {
                name: "F380M",
                wavelength: 3.828e-6,
                bandwidth: 0.205e-6,
            },
            FilterDefinition {
                name: "F430M",
                wavelength: 4.286e-6,
                bandwidth: 0.202e-6,
            },
            FilterDefinition {
                name: "F480M",
                wavelength: 4.817e-6,
                bandwidth: 0.298e-6,
            },
        ];
        let sphere_filters = vec![
            FilterDefinition {
                name: "J2",
                wavelength: 1.190e-6,
                bandwidth: 0.042e-6,
            },
            FilterDefinition {
                name: "J3",
                wavelength: 1.273e-6,
                bandwidth: 0.046e-6,
            },
            FilterDefinition {
                name: "H2",
                wavelength: 1.593e-6,
                bandwidth: 0.052e-6,
            },
            FilterDefinition {
                name: "H3",
                wavelength: 1.667e-6,
                bandwidth: 0.054e-6,
            },
            FilterDefinition {
                name: "CntH",
                wavelength: 1.573e-6,
                bandwidth: 0.023e-6,
            },
            FilterDefinition {
                name: "K1",
                wavelength: 2.110e-6,
                bandwidth: 0.102e-6,
            },
            FilterDefinition {
                name: "K2",
                wavelength: 2.251e-6,
                bandwidth: 0.109e-6,
            },
            FilterDefinition {
                name: "CntK1",
                wavelength: 2.091e-6,
                bandwidth: 0.034e-6,
            },
        ];
        let sphere_ifs_filters = vec![
            FilterDefinition {
                name: "YJ",
                wavelength: 1.15e-6,
                bandwidth: 0.40e-6,
            },
            FilterDefinition {
                name: "YJH",
                wavelength: 1.30e-6,
                bandwidth: 0.70e-6,
            },
        ];
        let naco_filters = vec![
            FilterDefinition {
                name: "J",
                wavelength: 1.265e-6,
                bandwidth: 0.25e-6,
            },
            FilterDefinition {
                name: "H",
                wavelength: 1.66e-6,
                bandwidth: 0.33e-6,
            },
            FilterDefinition {
                name: "Ks",
                wavelength: 2.18e-6,
                bandwidth: 0.35e-6,
            },
            FilterDefinition {
                name: "L_prime",
                wavelength: 3.80e-6,
                bandwidth: 0.62e-6,
            },
            FilterDefinition {
                name: "NB_3.74",
                wavelength: 3.74e-6,
                bandwidth: 0.02e-6,
            },
        ];
        let vampires_filters = vec![
            FilterDefinition {
                name: "625-50",
                wavelength: 625e-9,
                bandwidth: 50e-9,
            },
            FilterDefinition {
                name: "675-50",
                wavelength: 675e-9,
                bandwidth: 50e-9,
            },
            FilterDefinition {
                name: "725-50",
                wavelength: 725e-9,
                bandwidth: 50e-9,
            },
            FilterDefinition {
                name: "750-50",
                wavelength: 750e-9,
                bandwidth: 50e-9,
            },
            FilterDefinition {
                name: "775-50",
                wavelength: 775e-9,
                bandwidth: 50e-9,
            },
        ];

        let simulated_filters = niriss_filters
            .iter()
            .chain(sphere_filters.iter())
            .copied()
            .collect();

        let mut entries = BTreeMap::new();
        entries.insert(
            Instrument::Niriss,
            InstrumentEntry {
                telescope: "JWST",
                pixel_scale_mas: Some(65.6),
                masks: vec![niriss_g7.clone()],
                filters: niriss_filters,
            },
        );
        entries.insert(
            Instrument::Sphere,
            InstrumentEntry {
                telescope: "VLT",
                pixel_scale_mas: Some(12.27),
                masks: vec![sphere_g7.clone()],
                filters: sphere_filters,
            },
        );
        entries.insert(
            Instrument::SphereIfs,
            InstrumentEntry {
                telescope: "VLT",
                pixel_scale_mas: Some(7.46),
                masks: vec![sphere_g7],
                filters: sphere_ifs_filters,
            },
        );
        entries.insert(
            Instrument::Naco,
            InstrumentEntry {
                telescope: "VLT",
                pixel_scale_mas: Some(27.15),
                masks: vec![naco_g7, naco_g9.clone(), naco_bb9],
                filters: naco_filters,
            },
        );
        entries.insert(
            Instrument::Vampires,
            InstrumentEntry {
                telescope: "Subaru",
                pixel_scale_mas: Some(6.475),
                masks: vec![vampires_g18],
                filters: vampires_filters,
            },
        );
        entries.insert(
            Instrument::Simulated,
            InstrumentEntry {
                telescope: "SIMULATED",
                pixel_scale_mas: None,
                masks: vec![niriss_g7, naco_g9],
                filters: simulated_filters,
            },
        );

        Catalog { entries }
    }
}
