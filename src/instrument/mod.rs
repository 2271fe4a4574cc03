// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Instrument profiles.
//!
//! Every instrument stores its observation metadata under different header
//! keywords. Each profile knows where to look, and the [`InstrumentProfile`]
//! trait gives the rest of the pipeline a single way of asking for it.
//! Anything that can't be found is left as `None`; the caller decides on a
//! fallback.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use hifitime::Epoch;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::mask::{get_pixel_scale, instrument_entry, Instrument};

/// Header keywords whose cards may appear many times.
const COMMENTARY_KEYWORDS: [&str; 3] = ["HISTORY", "COMMENT", ""];

/// A FITS header, reduced to keyword-value pairs. Commentary cards are
/// concatenated (newline separated) under their keyword.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header(BTreeMap<String, String>);

impl Header {
    pub fn new() -> Header {
        Header::default()
    }

    /// Add a card. Values are stored without surrounding quotes or padding.
    pub fn push<K: Into<String>, V: Into<String>>(&mut self, keyword: K, value: V) {
        let keyword = keyword.into().trim().to_uppercase();
        let value = value.into();
        let value = value.trim().trim_matches('\'').trim().to_string();
        if COMMENTARY_KEYWORDS.contains(&keyword.as_str()) {
            match self.0.get_mut(&keyword) {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(&value);
                }
                None => {
                    self.0.insert(keyword, value);
                }
            }
        } else {
            self.0.insert(keyword, value);
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.0
            .get(&keyword.to_uppercase())
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains_key(&keyword.to_uppercase())
    }

    fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword)
            .and_then(|s| s.parse().ok())
            .filter(|v: &f64| v.is_finite())
    }

    fn get_string(&self, keyword: &str) -> Option<String> {
        self.get(keyword).map(|s| s.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (k, v) in iter {
            header.push(k, v);
        }
        header
    }
}

/// Metadata pulled out of a header. Everything is optional; see
/// [`HeaderMetadata::with_fallbacks`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderMetadata {
    pub target: Option<String>,
    pub date_obs: Option<String>,
    pub telescope: Option<String>,
    pub observer: Option<String>,
    pub filter: Option<String>,
    /// Modified Julian date of the observation start.
    pub mjd: Option<f64>,
    /// \[degrees\]
    pub parallactic_angle: Option<f64>,
    /// Pointing right ascension \[degrees\].
    pub ra: Option<f64>,
    /// Pointing declination \[degrees\].
    pub dec: Option<f64>,
}

impl HeaderMetadata {
    /// Fill in what the header didn't have. The MJD is derived from the
    /// observation date if it's missing, and the telescope comes from the
    /// catalogue.
    pub fn with_fallbacks(mut self, instrument: Instrument) -> HeaderMetadata {
        if self.mjd.is_none() {
            self.mjd = self.date_obs.as_deref().and_then(mjd_from_date);
        }
        if self.telescope.is_none() {
            self.telescope = instrument_entry(instrument)
                .ok()
                .map(|e| e.telescope.to_string());
        }
        self
    }
}

/// The fixed contract every instrument profile implements.
pub trait InstrumentProfile: Send + Sync {
    fn instrument(&self) -> Instrument;

    /// The native pixel scale \[milliarcseconds\].
    fn pixel_scale_mas(&self) -> Option<f64> {
        get_pixel_scale(self.instrument())
    }

    /// Pull the metadata out of a header. Keys that aren't present are
    /// `None`.
    fn extract_metadata(&self, header: &Header) -> HeaderMetadata;
}

/// Get the profile of an instrument.
pub fn profile_for(instrument: Instrument) -> Box<dyn InstrumentProfile> {
    match instrument {
        Instrument::Niriss => Box::new(Niriss),
        Instrument::Sphere => Box::new(Eso {
            instrument,
            filter_keyword: "HIERARCH ESO INS COMB IFLT",
        }),
        Instrument::SphereIfs => Box::new(Eso {
            instrument,
            filter_keyword: "HIERARCH ESO INS2 COMB IFS",
        }),
        Instrument::Naco => Box::new(Eso {
            instrument,
            filter_keyword: "HIERARCH ESO INS OPTI6 ID",
        }),
        Instrument::Vampires => Box::new(Vampires),
        Instrument::Simulated => Box::new(Simulated),
    }
}

struct Niriss;

impl InstrumentProfile for Niriss {
    fn instrument(&self) -> Instrument {
        Instrument::Niriss
    }

    fn extract_metadata(&self, header: &Header) -> HeaderMetadata {
        let date_obs = match (header.get("DATE-OBS"), header.get("TIME-OBS")) {
            (Some(d), Some(t)) if !d.contains('T') => Some(format!("{d}T{t}")),
            (Some(d), _) => Some(d.to_string()),
            (None, _) => None,
        };
        HeaderMetadata {
            target: header
                .get_string("TARGPROP")
                .or_else(|| header.get_string("TARGNAME")),
            date_obs,
            telescope: header.get_string("TELESCOP"),
            observer: header.get_string("PI_NAME"),
            filter: header.get_string("FILTER"),
            mjd: header.get_f64("EXPSTART"),
            parallactic_angle: header.get_f64("ROLL_REF"),
            ra: header
                .get_f64("TARG_RA")
                .or_else(|| header.get_f64("RA_REF")),
            dec: header
                .get_f64("TARG_DEC")
                .or_else(|| header.get_f64("DEC_REF")),
        }
    }
}

/// SPHERE, SPHERE-IFS and NACO share the ESO keyword dictionary; only the
/// filter keyword differs.
struct Eso {
    instrument: Instrument,
    filter_keyword: &'static str,
}

impl InstrumentProfile for Eso {
    fn instrument(&self) -> Instrument {
        self.instrument
    }

    fn extract_metadata(&self, header: &Header) -> HeaderMetadata {
        let parallactic_angle = match (
            header.get_f64("HIERARCH ESO TEL PARANG START"),
            header.get_f64("HIERARCH ESO TEL PARANG END"),
        ) {
            (Some(start), Some(end)) => Some(mean_angle_deg(start, end)),
            (Some(pa), None) | (None, Some(pa)) => Some(pa),
            (None, None) => None,
        };
        HeaderMetadata {
            target: header.get_string("OBJECT"),
            date_obs: header.get_string("DATE-OBS"),
            telescope: header.get_string("TELESCOP"),
            observer: header.get_string("OBSERVER"),
            filter: header.get_string(self.filter_keyword),
            mjd: header.get_f64("MJD-OBS"),
            parallactic_angle,
            ra: header.get_f64("RA"),
            dec: header.get_f64("DEC"),
        }
    }
}

struct Vampires;

impl InstrumentProfile for Vampires {
    fn instrument(&self) -> Instrument {
        Instrument::Vampires
    }

    fn extract_metadata(&self, header: &Header) -> HeaderMetadata {
        let date_obs = match (header.get("DATE-OBS"), header.get("UT")) {
            (Some(d), Some(t)) if !d.contains('T') => Some(format!("{d}T{t}")),
            (Some(d), _) => Some(d.to_string()),
            (None, _) => None,
        };
        HeaderMetadata {
            target: header.get_string("OBJECT"),
            date_obs,
            telescope: header.get_string("TELESCOP"),
            observer: header.get_string("OBSERVER"),
            filter: header
                .get_string("FILTER01")
                .or_else(|| header.get_string("FILTER")),
            mjd: header.get_f64("MJD"),
            parallactic_angle: header.get_f64("PA").or_else(|| header.get_f64("D_IMRPAP")),
            ra: header.get_f64("RA"),
            dec: header.get_f64("DEC"),
        }
    }
}

/// Synthetic data only carries whatever generic keywords the simulator wrote.
struct Simulated;

impl InstrumentProfile for Simulated {
    fn instrument(&self) -> Instrument {
        Instrument::Simulated
    }

    fn extract_metadata(&self, header: &Header) -> HeaderMetadata {
        HeaderMetadata {
            target: header.get_string("OBJECT"),
            date_obs: header.get_string("DATE-OBS"),
            telescope: header.get_string("TELESCOP"),
            observer: header.get_string("OBSERVER"),
            filter: header.get_string("FILTER"),
            mjd: header.get_f64("MJD-OBS"),
            parallactic_angle: header.get_f64("PA"),
            ra: header.get_f64("RA"),
            dec: header.get_f64("DEC"),
        }
    }
}

/// The circular mean of two angles \[degrees\].
fn mean_angle_deg(a: f64, b: f64) -> f64 {
    let (sa, ca) = a.to_radians().sin_cos();
    let (sb, cb) = b.to_radians().sin_cos();
    (sa + sb).atan2(ca + cb).to_degrees()
}

/// Convert an ISO 8601 date (possibly without a time) into an MJD (UTC).
pub(crate) fn mjd_from_date(date: &str) -> Option<f64> {
    let date = date.trim();
    let candidates = [
        date.to_string(),
        format!("{date}T00:00:00"),
        format!("{date} UTC"),
    ];
    for candidate in candidates {
        if let Ok(epoch) = Epoch::from_gregorian_str(&candidate) {
            return Some(epoch.to_mjd_utc_days());
        }
    }
    trace!("Couldn't interpret '{date}' as a date");
    None
}
