// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use strum::IntoEnumIterator;

use super::*;

#[test]
fn test_simulated_only_copies_present_keys() {
    let header: Header = [
        ("DATE-OBS", "2021-06-23T04:10:00"),
        ("TELESCOP", "'SIM     '"),
        ("HISTORY", "made by a simulator"),
    ]
    .into_iter()
    .collect();

    let metadata = profile_for(Instrument::Simulated).extract_metadata(&header);
    assert_eq!(metadata.date_obs.as_deref(), Some("2021-06-23T04:10:00"));
    assert_eq!(metadata.telescope.as_deref(), Some("SIM"));
    assert!(metadata.observer.is_none());
    assert!(metadata.target.is_none());
    assert!(metadata.mjd.is_none());

    // Only the MJD can be derived.
    let metadata = metadata.with_fallbacks(Instrument::Simulated);
    assert!(metadata.observer.is_none());
    let mjd = metadata.mjd.unwrap();
    assert_abs_diff_eq!(mjd, 59388.0 + (4.0 + 10.0 / 60.0) / 24.0, epsilon = 1e-6);
}

#[test]
fn test_commentary_cards_are_kept() {
    let mut header = Header::new();
    header.push("HISTORY", "first");
    header.push("history", "second");
    header.push("OBJECT", "HD 1234");
    assert_eq!(header.get("HISTORY"), Some("first\nsecond"));
    assert_eq!(header.get("object"), Some("HD 1234"));
    assert_eq!(header.len(), 2);
}

#[test]
fn test_eso_parallactic_angle() {
    let header: Header = [
        ("OBJECT", "HD 142527"),
        ("HIERARCH ESO TEL PARANG START", "179.0"),
        ("HIERARCH ESO TEL PARANG END", "-179.0"),
        ("HIERARCH ESO INS COMB IFLT", "DB_K12"),
        ("MJD-OBS", "57852.3"),
    ]
    .into_iter()
    .collect();
    let metadata = profile_for(Instrument::Sphere).extract_metadata(&header);
    assert_eq!(metadata.target.as_deref(), Some("HD 142527"));
    assert_eq!(metadata.filter.as_deref(), Some("DB_K12"));
    assert_abs_diff_eq!(metadata.mjd.unwrap(), 57852.3);
    // Wrapping around +-180 must not average to 0.
    assert_abs_diff_eq!(metadata.parallactic_angle.unwrap().abs(), 180.0, epsilon = 1e-9);
}

#[test]
fn test_niriss_date_and_time_are_joined() {
    let header: Header = [
        ("DATE-OBS", "2022-07-01"),
        ("TIME-OBS", "12:00:00"),
        ("TARGPROP", "AB-DOR"),
    ]
    .into_iter()
    .collect();
    let metadata = profile_for(Instrument::Niriss)
        .extract_metadata(&header)
        .with_fallbacks(Instrument::Niriss);
    assert_eq!(metadata.date_obs.as_deref(), Some("2022-07-01T12:00:00"));
    assert_eq!(metadata.target.as_deref(), Some("AB-DOR"));
    assert_eq!(metadata.telescope.as_deref(), Some("JWST"));
    assert_abs_diff_eq!(metadata.mjd.unwrap(), 59761.5, epsilon = 1e-6);
}

#[test]
fn test_every_profile_handles_an_empty_header() {
    let header = Header::new();
    for instrument in Instrument::iter() {
        let profile = profile_for(instrument);
        assert_eq!(profile.instrument(), instrument);
        let metadata = profile.extract_metadata(&header);
        assert_eq!(metadata, HeaderMetadata::default());
    }
}

#[test]
fn test_pixel_scale() {
    for instrument in [Instrument::Niriss, Instrument::Sphere, Instrument::Vampires] {
        let scale = profile_for(instrument).pixel_scale_mas();
        assert!(scale.unwrap() > 0.0);
    }
    assert!(profile_for(Instrument::Simulated).pixel_scale_mas().is_none());
}

#[test]
fn test_bad_dates() {
    assert!(mjd_from_date("yesterday").is_none());
    assert_abs_diff_eq!(mjd_from_date("2000-01-01").unwrap(), 51544.0, epsilon = 1e-9);
}
