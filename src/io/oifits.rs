// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing observables as OIFITS (version 2) files.
//!
//! The primary HDU carries the provenance of the observables; everything
//! needed to rebuild an [`ObservableBundle`] is in the primary header and the
//! OI_TARGET, OI_WAVELENGTH, OI_ARRAY, OI_VIS2 and OI_T3 tables. The per-frame
//! series are not written.

use std::{collections::HashMap, path::Path, str::FromStr};

use fitsio::{
    hdu::FitsHdu,
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};
use log::{debug, trace};
use ndarray::Array2;
use num_complex::Complex64;

use super::{
    fits::{
        fits_create, fits_get_col, fits_get_logical_col, fits_get_optional_key,
        fits_get_repeating_f64_col, fits_get_repeating_i32_col, fits_get_required_key,
        fits_open, fits_open_hdu, fits_read_header, fits_write_header, fits_write_logical_col,
    },
    OifitsError,
};
use crate::{
    bispectrum::ExtractParams,
    bundle::{ObservableBundle, ObservationInfo},
    instrument::Header,
    mask::{baseline_index, parse_instrument, Mask, MaskOptions},
    peak::PeakMethod,
};

const OI_REVN: i64 = 2;

/// The width of string columns.
const NAME_WIDTH: usize = 16;

/// Write a bundle to an OIFITS file, replacing any existing file.
pub fn write_oifits<P: AsRef<Path>>(bundle: &ObservableBundle, file: P) -> Result<(), OifitsError> {
    let file = file.as_ref();
    debug!("Writing OIFITS file {}", file.display());
    if file.exists() {
        std::fs::remove_file(file)?;
    }
    let mut fptr = fits_create(file)?;
    let info = &bundle.info;
    let array_name = format!("{}_{}", info.instrument, info.mask);
    let ins_name = format!("{}_{}", info.instrument, info.filter);
    let mjd = info.mjd.unwrap_or(f64::NAN);

    // Primary HDU.
    {
        let hdu = fits_open_hdu(&mut fptr, 0)?;
        write_primary_keys(&mut fptr, &hdu, bundle)?;
    }

    // OI_TARGET
    {
        let hdu = fptr.create_table(
            "OI_TARGET",
            &[
                int_col("TARGET_ID")?,
                string_col("TARGET")?,
                double_col("RAEP0")?,
                double_col("DECEP0")?,
                double_col("EQUINOX")?,
            ],
        )?;
        hdu.write_key(&mut fptr, "OI_REVN", OI_REVN)?;
        hdu.write_col(&mut fptr, "TARGET_ID", &[1i32])?;
        hdu.write_col(&mut fptr, "TARGET", &[info.target.clone()])?;
        hdu.write_col(&mut fptr, "RAEP0", &[info.ra.unwrap_or(f64::NAN)])?;
        hdu.write_col(&mut fptr, "DECEP0", &[info.dec.unwrap_or(f64::NAN)])?;
        hdu.write_col(&mut fptr, "EQUINOX", &[2000.0f64])?;
    }

    // OI_WAVELENGTH
    {
        let hdu = fptr.create_table(
            "OI_WAVELENGTH",
            &[double_col("EFF_WAVE")?, double_col("EFF_BAND")?],
        )?;
        hdu.write_key(&mut fptr, "OI_REVN", OI_REVN)?;
        hdu.write_key(&mut fptr, "INSNAME", ins_name.as_str())?;
        hdu.write_col(&mut fptr, "EFF_WAVE", &[info.wavelength])?;
        hdu.write_col(&mut fptr, "EFF_BAND", &[info.bandwidth])?;
    }

    // OI_ARRAY; one station per aperture.
    {
        let mask = &bundle.mask;
        let hdu = fptr.create_table(
            "OI_ARRAY",
            &[
                string_col("TEL_NAME")?,
                string_col("STA_NAME")?,
                int_col("STA_INDEX")?,
                double_col("DIAMETER")?,
                ColumnDescription::new("STAXYZ")
                    .with_type(ColumnDataType::Double)
                    .that_repeats(3)
                    .create()?,
            ],
        )?;
        hdu.write_key(&mut fptr, "OI_REVN", OI_REVN)?;
        hdu.write_key(&mut fptr, "ARRNAME", array_name.as_str())?;
        hdu.write_key(&mut fptr, "FRAME", "GEOCENTRIC")?;
        let names: Vec<String> = (0..mask.num_apertures()).map(|i| format!("A{i}")).collect();
        hdu.write_col(&mut fptr, "TEL_NAME", &names)?;
        hdu.write_col(&mut fptr, "STA_NAME", &names)?;
        hdu.write_col(
            &mut fptr,
            "STA_INDEX",
            &(1..=mask.num_apertures() as i32).collect::<Vec<_>>(),
        )?;
        hdu.write_col(
            &mut fptr,
            "DIAMETER",
            &vec![mask.hole_diameter; mask.num_apertures()],
        )?;
        let xyz: Vec<f64> = mask.apertures.iter().flat_map(|&[x, y]| [x, y, 0.0]).collect();
        hdu.write_col(&mut fptr, "STAXYZ", &xyz)?;
    }

    // OI_VIS2; one row per baseline.
    {
        let num_baselines = bundle.num_baselines();
        let hdu = fptr.create_table(
            "OI_VIS2",
            &[
                int_col("TARGET_ID")?,
                double_col("TIME")?,
                double_col("MJD")?,
                double_col("INT_TIME")?,
                double_col("VIS2DATA")?,
                double_col("VIS2ERR")?,
                double_col("UCOORD")?,
                double_col("VCOORD")?,
                ColumnDescription::new("STA_INDEX")
                    .with_type(ColumnDataType::Int)
                    .that_repeats(2)
                    .create()?,
                bool_col("FLAG")?,
            ],
        )?;
        write_data_table_keys(&mut fptr, &hdu, info, &array_name, &ins_name)?;
        hdu.write_col(&mut fptr, "TARGET_ID", &vec![1i32; num_baselines])?;
        hdu.write_col(&mut fptr, "TIME", &vec![0.0f64; num_baselines])?;
        hdu.write_col(&mut fptr, "MJD", &vec![mjd; num_baselines])?;
        hdu.write_col(&mut fptr, "INT_TIME", &vec![0.0f64; num_baselines])?;
        hdu.write_col(&mut fptr, "VIS2DATA", &bundle.vis2)?;
        hdu.write_col(&mut fptr, "VIS2ERR", &bundle.vis2_err)?;
        let (u, v): (Vec<f64>, Vec<f64>) = bundle
            .uv
            .iter()
            .map(|[u, v]| (u * info.wavelength, v * info.wavelength))
            .unzip();
        hdu.write_col(&mut fptr, "UCOORD", &u)?;
        hdu.write_col(&mut fptr, "VCOORD", &v)?;
        let stations: Vec<i32> = bundle
            .mask
            .baselines
            .iter()
            .flat_map(|bl| [bl.apertures.0 as i32 + 1, bl.apertures.1 as i32 + 1])
            .collect();
        hdu.write_col(&mut fptr, "STA_INDEX", &stations)?;
        fits_write_logical_col(&mut fptr, &hdu, "FLAG", &bundle.baseline_flags)?;
    }

    // OI_T3; one row per triangle.
    {
        let num_triangles = bundle.num_triangles();
        let hdu = fptr.create_table(
            "OI_T3",
            &[
                int_col("TARGET_ID")?,
                double_col("TIME")?,
                double_col("MJD")?,
                double_col("INT_TIME")?,
                double_col("T3AMP")?,
                double_col("T3AMPERR")?,
                double_col("T3PHI")?,
                double_col("T3PHIERR")?,
                double_col("U1COORD")?,
                double_col("V1COORD")?,
                double_col("U2COORD")?,
                double_col("V2COORD")?,
                ColumnDescription::new("STA_INDEX")
                    .with_type(ColumnDataType::Int)
                    .that_repeats(3)
                    .create()?,
                bool_col("FLAG")?,
            ],
        )?;
        write_data_table_keys(&mut fptr, &hdu, info, &array_name, &ins_name)?;
        hdu.write_col(&mut fptr, "TARGET_ID", &vec![1i32; num_triangles])?;
        hdu.write_col(&mut fptr, "TIME", &vec![0.0f64; num_triangles])?;
        hdu.write_col(&mut fptr, "MJD", &vec![mjd; num_triangles])?;
        hdu.write_col(&mut fptr, "INT_TIME", &vec![0.0f64; num_triangles])?;
        let amp: Vec<f64> = bundle.bispectrum.iter().map(|b| b.norm()).collect();
        hdu.write_col(&mut fptr, "T3AMP", &amp)?;
        hdu.write_col(&mut fptr, "T3AMPERR", &bundle.bispectrum_amp_err)?;
        hdu.write_col(&mut fptr, "T3PHI", &bundle.closure_phase_deg())?;
        let phi_err: Vec<f64> = bundle
            .closure_phase_err
            .iter()
            .map(|e| e.to_degrees())
            .collect();
        hdu.write_col(&mut fptr, "T3PHIERR", &phi_err)?;

        let mut uv = [vec![], vec![], vec![], vec![]];
        for i_tri in 0..num_triangles {
            let [[u1, v1], [u2, v2]] = bundle.triangle_uv(i_tri);
            for (col, value) in uv.iter_mut().zip([u1, v1, u2, v2]) {
                col.push(value * info.wavelength);
            }
        }
        for (name, values) in ["U1COORD", "V1COORD", "U2COORD", "V2COORD"]
            .into_iter()
            .zip(uv.iter())
        {
            hdu.write_col(&mut fptr, name, values)?;
        }
        let stations: Vec<i32> = bundle
            .mask
            .triangles
            .iter()
            .flat_map(|t| t.apertures.map(|a| a as i32 + 1))
            .collect();
        hdu.write_col(&mut fptr, "STA_INDEX", &stations)?;
        fits_write_logical_col(&mut fptr, &hdu, "FLAG", &bundle.triangle_flags)?;
    }

    Ok(())
}

fn write_primary_keys(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    bundle: &ObservableBundle,
) -> Result<(), OifitsError> {
    let info = &bundle.info;
    hdu.write_key(fptr, "OBJECT", info.target.as_str())?;
    hdu.write_key(fptr, "TELESCOP", info.telescope.as_str())?;
    hdu.write_key(fptr, "INSTRUME", info.instrument.to_string())?;
    hdu.write_key(fptr, "FILTER", info.filter.as_str())?;
    hdu.write_key(fptr, "MASK", info.mask.as_str())?;
    hdu.write_key(fptr, "HOLEDIAM", bundle.mask.hole_diameter)?;
    hdu.write_key(fptr, "PIXSCALE", info.pixel_scale_mas)?;
    if let Some(date) = &info.date_obs {
        hdu.write_key(fptr, "DATE-OBS", date.as_str())?;
    }
    if let Some(observer) = &info.observer {
        hdu.write_key(fptr, "OBSERVER", observer.as_str())?;
    }
    if let Some(mjd) = info.mjd {
        hdu.write_key(fptr, "MJD-OBS", mjd)?;
    }
    if let Some(pa) = info.parallactic_angle {
        hdu.write_key(fptr, "PARANG", pa)?;
    }
    if let Some(source) = &info.source_file {
        hdu.write_key(fptr, "SRCFILE", source.as_str())?;
    }
    hdu.write_key(fptr, "NFRAMES", bundle.num_frames as i64)?;
    hdu.write_key(fptr, "NKEPT", bundle.num_kept_frames() as i64)?;
    hdu.write_key(fptr, "NFALLBCK", bundle.num_fallbacks as i64)?;

    hdu.write_key(fptr, "CALIB", i64::from(bundle.calibrated))?;
    hdu.write_key(fptr, "NCALIB", bundle.calibrators.len() as i64)?;
    for (i, cal) in bundle.calibrators.iter().enumerate() {
        hdu.write_key(fptr, &format!("CALTGT{}", i + 1), cal.target.as_str())?;
    }

    if let Some(params) = &bundle.params {
        hdu.write_key(fptr, "PEAKMETH", params.peakmethod.to_string())?;
        hdu.write_key(fptr, "FW_SPLOD", params.fw_splodge)?;
        hdu.write_key(fptr, "CUTOFF", params.cutoff)?;
        hdu.write_key(fptr, "N_WL", params.n_wl as i64)?;
        if let Some(i_wl) = params.i_wl {
            hdu.write_key(fptr, "I_WL", i_wl as i64)?;
        }
        hdu.write_key(fptr, "UNBIAS", i64::from(params.unbias_v2))?;
        hdu.write_key(fptr, "MULTITRI", i64::from(params.bs_multi_tri))?;
        hdu.write_key(fptr, "SCALE_UV", params.scaling_uv)?;
        hdu.write_key(fptr, "THETADET", params.theta_detector)?;
        if let Some(d) = params.hole_diam {
            hdu.write_key(fptr, "HOLEDOVR", d)?;
        }
        if let Some(clip) = params.clip.filter(|c| c.is_finite()) {
            hdu.write_key(fptr, "CLIP", clip)?;
        }
        if let Some(window) = params.window {
            hdu.write_key(fptr, "WINDOW", window)?;
        }
    }

    // The rest of the cube's header. Cards written above take precedence.
    let written = fits_read_header(fptr, hdu)?;
    fits_write_header(fptr, hdu, &info.header, |keyword| {
        written.contains(keyword) || is_managed_keyword(keyword)
    })?;
    Ok(())
}

/// Keywords that describe the image data of a cube, or that this module
/// writes itself when it has something to say.
fn is_managed_keyword(keyword: &str) -> bool {
    const MANAGED: [&str; 20] = [
        "XTENSION", "PCOUNT", "GCOUNT", "BSCALE", "BZERO", "BLANK", "EXTNAME", "CHECKSUM",
        "DATASUM", "LONGSTRN", "DATE-OBS", "OBSERVER", "MJD-OBS", "PARANG", "SRCFILE", "I_WL",
        "HOLEDOVR", "CLIP", "WINDOW", "PEAKMETH",
    ];
    MANAGED.contains(&keyword)
        || keyword.starts_with("NAXIS")
        || keyword.starts_with("CALTGT")
}

fn write_data_table_keys(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    info: &ObservationInfo,
    array_name: &str,
    ins_name: &str,
) -> Result<(), OifitsError> {
    hdu.write_key(fptr, "OI_REVN", OI_REVN)?;
    hdu.write_key(
        fptr,
        "DATE-OBS",
        info.date_obs.as_deref().unwrap_or("UNKNOWN"),
    )?;
    hdu.write_key(fptr, "ARRNAME", array_name)?;
    hdu.write_key(fptr, "INSNAME", ins_name)?;
    Ok(())
}

fn double_col(name: &str) -> Result<fitsio::tables::ConcreteColumnDescription, OifitsError> {
    Ok(ColumnDescription::new(name)
        .with_type(ColumnDataType::Double)
        .create()?)
}

fn int_col(name: &str) -> Result<fitsio::tables::ConcreteColumnDescription, OifitsError> {
    Ok(ColumnDescription::new(name)
        .with_type(ColumnDataType::Int)
        .create()?)
}

fn bool_col(name: &str) -> Result<fitsio::tables::ConcreteColumnDescription, OifitsError> {
    Ok(ColumnDescription::new(name)
        .with_type(ColumnDataType::Logical)
        .create()?)
}

fn string_col(name: &str) -> Result<fitsio::tables::ConcreteColumnDescription, OifitsError> {
    Ok(ColumnDescription::new(name)
        .with_type(ColumnDataType::String)
        .that_repeats(NAME_WIDTH)
        .create()?)
}

/// Read a bundle from an OIFITS file written by [`write_oifits`]. Rows of the
/// OI_VIS2 and OI_T3 tables may come in any order; they are placed by their
/// station indices.
pub fn read_oifits<P: AsRef<Path>>(file: P) -> Result<ObservableBundle, OifitsError> {
    let file = file.as_ref();
    debug!("Reading OIFITS file {}", file.display());
    let unrecognised = |reason: String| OifitsError::Unrecognised {
        file: file.to_path_buf(),
        reason,
    };

    let mut fptr = fits_open(file)?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    let header = fits_read_header(&mut fptr, &hdu)?;
    let instrument_name: String = fits_get_required_key(&mut fptr, &hdu, "INSTRUME")?;
    let instrument = parse_instrument(&instrument_name).map_err(|e| unrecognised(e.to_string()))?;
    let mask_name: String = fits_get_required_key(&mut fptr, &hdu, "MASK")?;
    let filter: String = fits_get_required_key(&mut fptr, &hdu, "FILTER")?;
    let pixel_scale_mas: Option<f64> = fits_get_optional_key(&mut fptr, &hdu, "PIXSCALE")?;
    let num_frames: Option<usize> = fits_get_optional_key(&mut fptr, &hdu, "NFRAMES")?;
    let num_kept: Option<usize> = fits_get_optional_key(&mut fptr, &hdu, "NKEPT")?;
    let num_fallbacks: Option<usize> = fits_get_optional_key(&mut fptr, &hdu, "NFALLBCK")?;
    let calibrated: Option<i64> = fits_get_optional_key(&mut fptr, &hdu, "CALIB")?;
    let num_calibrators: Option<usize> = fits_get_optional_key(&mut fptr, &hdu, "NCALIB")?;
    let mut calibrator_names = vec![];
    for i in 0..num_calibrators.unwrap_or(0) {
        let name: Option<String> =
            fits_get_optional_key(&mut fptr, &hdu, &format!("CALTGT{}", i + 1))?;
        calibrator_names.push(name.unwrap_or_else(|| "Unknown".to_string()));
    }
    let params = read_params(&mut fptr, &hdu, &header)?;

    // OI_TARGET
    let hdu = fits_open_hdu(&mut fptr, "OI_TARGET")?;
    let targets: Vec<String> = fits_get_col(&mut fptr, &hdu, "TARGET")?;
    let ra: Vec<f64> = fits_get_col(&mut fptr, &hdu, "RAEP0")?;
    let dec: Vec<f64> = fits_get_col(&mut fptr, &hdu, "DECEP0")?;
    let finite = |v: Option<&f64>| v.copied().filter(|x| x.is_finite());

    // OI_WAVELENGTH
    let hdu = fits_open_hdu(&mut fptr, "OI_WAVELENGTH")?;
    let wavelengths: Vec<f64> = fits_get_col(&mut fptr, &hdu, "EFF_WAVE")?;
    let bandwidths: Vec<f64> = fits_get_col(&mut fptr, &hdu, "EFF_BAND")?;
    let wavelength = match wavelengths.as_slice() {
        [w] => *w,
        _ => {
            return Err(unrecognised(format!(
                "expected 1 wavelength, found {}",
                wavelengths.len()
            )))
        }
    };

    // OI_ARRAY
    let hdu = fits_open_hdu(&mut fptr, "OI_ARRAY")?;
    let diameters: Vec<f64> = fits_get_col(&mut fptr, &hdu, "DIAMETER")?;
    let xyz = fits_get_repeating_f64_col(&mut fptr, &hdu, "STAXYZ", 3)?;
    let holes: Vec<[f64; 2]> = xyz.chunks_exact(3).map(|c| [c[0], c[1]]).collect();
    let hole_diameter = diameters
        .first()
        .copied()
        .ok_or_else(|| unrecognised("OI_ARRAY has no stations".to_string()))?;
    let mask = Mask::from_apertures(
        instrument,
        &mask_name,
        &holes,
        hole_diameter,
        &MaskOptions::default(),
    )
    .map_err(|err| OifitsError::Mask {
        file: file.to_path_buf(),
        err,
    })?;
    let num_apertures = mask.num_apertures();
    let station = |index: i32| -> Result<usize, OifitsError> {
        match usize::try_from(index) {
            Ok(i) if (1..=num_apertures).contains(&i) => Ok(i - 1),
            _ => Err(OifitsError::Unrecognised {
                file: file.to_path_buf(),
                reason: format!("station index {index} is not in OI_ARRAY"),
            }),
        }
    };

    // OI_VIS2
    let hdu = fits_open_hdu(&mut fptr, "OI_VIS2")?;
    let vis2_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "VIS2DATA")?;
    let num_baselines = mask.num_baselines();
    check_len("VIS2DATA", num_baselines, vis2_rows.len())?;
    let vis2_err_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "VIS2ERR")?;
    let u_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "UCOORD")?;
    let v_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "VCOORD")?;
    let flag_rows = fits_get_logical_col(&mut fptr, &hdu, "FLAG")?;
    let mjd_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "MJD")?;
    let sta_rows = fits_get_repeating_i32_col(&mut fptr, &hdu, "STA_INDEX", 2)?;
    check_len("STA_INDEX", 2 * num_baselines, sta_rows.len())?;

    let mut vis2 = vec![f64::NAN; num_baselines];
    let mut vis2_err = vec![f64::NAN; num_baselines];
    let mut uv = vec![[f64::NAN; 2]; num_baselines];
    let mut baseline_flags = vec![true; num_baselines];
    for (row, pair) in sta_rows.chunks_exact(2).enumerate() {
        let (i, j) = (station(pair[0])?, station(pair[1])?);
        if i == j {
            return Err(unrecognised(format!("OI_VIS2 row {row} pairs a station with itself")));
        }
        let i_bl = baseline_index(num_apertures, i.min(j), i.max(j));
        // The baseline may have been written from j to i.
        let sign = if i < j { 1.0 } else { -1.0 };
        vis2[i_bl] = vis2_rows[row];
        vis2_err[i_bl] = vis2_err_rows[row];
        uv[i_bl] = [
            sign * u_rows[row] / wavelength,
            sign * v_rows[row] / wavelength,
        ];
        baseline_flags[i_bl] = flag_rows[row];
    }

    // OI_T3
    let hdu = fits_open_hdu(&mut fptr, "OI_T3")?;
    let amp_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "T3AMP")?;
    let num_triangles = mask.num_triangles();
    check_len("T3AMP", num_triangles, amp_rows.len())?;
    let amp_err_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "T3AMPERR")?;
    let phi_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "T3PHI")?;
    let phi_err_rows: Vec<f64> = fits_get_col(&mut fptr, &hdu, "T3PHIERR")?;
    let t3_flag_rows = fits_get_logical_col(&mut fptr, &hdu, "FLAG")?;
    let t3_sta_rows = fits_get_repeating_i32_col(&mut fptr, &hdu, "STA_INDEX", 3)?;
    check_len("STA_INDEX", 3 * num_triangles, t3_sta_rows.len())?;

    let triangle_lookup: HashMap<[usize; 3], usize> = mask
        .triangles
        .iter()
        .enumerate()
        .map(|(i, t)| (t.apertures, i))
        .collect();
    let mut bispectrum = vec![Complex64::new(f64::NAN, f64::NAN); num_triangles];
    let mut bispectrum_amp_err = vec![f64::NAN; num_triangles];
    let mut closure_phase = vec![f64::NAN; num_triangles];
    let mut closure_phase_err = vec![f64::NAN; num_triangles];
    let mut triangle_flags = vec![true; num_triangles];
    for (row, stations) in t3_sta_rows.chunks_exact(3).enumerate() {
        let apertures = [
            station(stations[0])?,
            station(stations[1])?,
            station(stations[2])?,
        ];
        let i_tri = *triangle_lookup.get(&apertures).ok_or_else(|| {
            unrecognised(format!(
                "OI_T3 row {row} has stations {stations:?}, which aren't an increasing triangle"
            ))
        })?;
        let phi = phi_rows[row].to_radians();
        bispectrum[i_tri] = Complex64::from_polar(amp_rows[row], phi);
        bispectrum_amp_err[i_tri] = amp_err_rows[row];
        closure_phase[i_tri] = phi;
        closure_phase_err[i_tri] = phi_err_rows[row].to_radians();
        triangle_flags[i_tri] = t3_flag_rows[row];
    }
    trace!("Read {num_baselines} baselines and {num_triangles} triangles");

    let mut info = ObservationInfo::from_header(
        instrument,
        &mask_name,
        &filter,
        wavelength,
        bandwidths.first().copied().unwrap_or(f64::NAN),
        pixel_scale_mas.unwrap_or(f64::NAN),
        Some(&header),
        targets.first().map(|t| t.trim()),
    );
    info.ra = finite(ra.first()).or(info.ra);
    info.dec = finite(dec.first()).or(info.dec);
    info.mjd = header
        .get("MJD-OBS")
        .and_then(|m| m.parse().ok())
        .or_else(|| finite(mjd_rows.first()))
        .or(info.mjd);
    info.parallactic_angle = header
        .get("PARANG")
        .and_then(|p| p.parse().ok())
        .or(info.parallactic_angle);
    info.source_file = header.get("SRCFILE").map(|s| s.to_string());

    let calibrators = calibrator_names
        .into_iter()
        .map(|target| ObservationInfo {
            target,
            date_obs: None,
            observer: None,
            mjd: None,
            parallactic_angle: None,
            ra: None,
            dec: None,
            source_file: None,
            header: Header::new(),
            ..info.clone()
        })
        .collect();
    let num_kept = num_kept.unwrap_or(0);

    Ok(ObservableBundle {
        info,
        params,
        mask,
        vis2,
        vis2_err,
        uv,
        baseline_flags,
        bispectrum,
        bispectrum_amp_err,
        closure_phase,
        closure_phase_err,
        triangle_flags,
        frame_vis2: Array2::zeros((0, num_baselines)),
        frame_bispectrum: Array2::zeros((0, num_triangles)),
        kept_frames: (0..num_kept).collect(),
        num_frames: num_frames.unwrap_or(num_kept),
        num_fallbacks: num_fallbacks.unwrap_or(0),
        calibrated: calibrated.unwrap_or(0) != 0,
        calibrators,
    })
}

/// The extraction parameters, if the file records them.
fn read_params(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    header: &Header,
) -> Result<Option<ExtractParams>, OifitsError> {
    let method: Option<String> = fits_get_optional_key(fptr, hdu, "PEAKMETH")?;
    let Some(peakmethod) = method.and_then(|m| PeakMethod::from_str(&m).ok()) else {
        return Ok(None);
    };
    let defaults = ExtractParams::default();
    let instrument = header
        .get("INSTRUME")
        .and_then(|i| parse_instrument(i).ok())
        .unwrap_or(defaults.instrument);
    let unbias: Option<i64> = fits_get_optional_key(fptr, hdu, "UNBIAS")?;
    let multi_tri: Option<i64> = fits_get_optional_key(fptr, hdu, "MULTITRI")?;

    Ok(Some(ExtractParams {
        peakmethod,
        instrument,
        maskname: header.get("MASK").unwrap_or_default().to_string(),
        filtname: header.get("FILTER").unwrap_or_default().to_string(),
        fw_splodge: fits_get_optional_key(fptr, hdu, "FW_SPLOD")?.unwrap_or(defaults.fw_splodge),
        cutoff: fits_get_optional_key(fptr, hdu, "CUTOFF")?.unwrap_or(defaults.cutoff),
        n_wl: fits_get_optional_key(fptr, hdu, "N_WL")?.unwrap_or(defaults.n_wl),
        i_wl: fits_get_optional_key(fptr, hdu, "I_WL")?,
        unbias_v2: unbias.map(|u| u != 0).unwrap_or(defaults.unbias_v2),
        bs_multi_tri: multi_tri.map(|m| m != 0).unwrap_or(defaults.bs_multi_tri),
        scaling_uv: fits_get_optional_key(fptr, hdu, "SCALE_UV")?.unwrap_or(defaults.scaling_uv),
        theta_detector: fits_get_optional_key(fptr, hdu, "THETADET")?
            .unwrap_or(defaults.theta_detector),
        hole_diam: fits_get_optional_key(fptr, hdu, "HOLEDOVR")?,
        clip: fits_get_optional_key(fptr, hdu, "CLIP")?,
        window: fits_get_optional_key(fptr, hdu, "WINDOW")?,
        ..defaults
    }))
}

fn check_len(thing: &'static str, expected: usize, actual: usize) -> Result<(), OifitsError> {
    if expected == actual {
        Ok(())
    } else {
        Err(OifitsError::BadShape {
            thing,
            reference: "apertures in OI_ARRAY",
            expected,
            actual,
        })
    }
}
