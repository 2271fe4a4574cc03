// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading and writing FITS files, and reading image
//! cubes.

use std::{
    ffi::{CStr, CString},
    fmt::Display,
    os::raw::c_char,
    path::{Path, PathBuf},
    ptr,
};

use fitsio::{hdu::*, FitsFile};
use log::{debug, trace};
use ndarray::{Array3, Array4};

use super::FitsError;
use crate::instrument::Header;

// Data type codes (fitsio.h).
const TLOGICAL: i32 = 14;
const TINT: i32 = 31;
const TDOUBLE: i32 = 82;

/// The length of a FITS card, plus one for the terminating nul.
const CARD_BUFFER_LEN: usize = 81;

/// The pixels of a FITS image, as a cube of frames.
#[derive(Debug, Clone)]
pub enum CubeData {
    /// `(frames, ny, nx)`. A single image is a cube of one frame.
    Single(Array3<f64>),

    /// `(channels, frames, ny, nx)`
    Spectral(Array4<f64>),
}

/// An image cube and the header describing it.
#[derive(Debug, Clone)]
pub struct ImageCube {
    pub data: CubeData,

    /// The primary header, updated with the cards of the image's HDU if the
    /// image isn't in the primary HDU.
    pub header: Header,

    pub file: PathBuf,
}

/// Read the image cube in a FITS file. The image is taken from the primary
/// HDU if it has one, otherwise from the "SCI" HDU, otherwise from the first
/// extension.
pub fn read_cube<P: AsRef<Path>>(file: P) -> Result<ImageCube, FitsError> {
    let file = file.as_ref();
    debug!("Reading image cube {}", file.display());
    let mut fptr = fits_open(file)?;
    let primary = fits_open_hdu(&mut fptr, 0)?;
    let mut header = fits_read_header(&mut fptr, &primary)?;

    let hdu = match &primary.info {
        HduInfo::ImageInfo { shape, .. } if !shape.is_empty() => primary,
        _ => {
            let hdu = match fptr.hdu("SCI") {
                Ok(hdu) => hdu,
                Err(_) => fits_open_hdu(&mut fptr, 1)?,
            };
            trace!("Using the image in HDU {}", hdu.number + 1);
            for (key, value) in fits_read_header(&mut fptr, &hdu)?.iter() {
                header.push(key.as_str(), value.as_str());
            }
            hdu
        }
    };

    let shape = fits_get_image_shape(&fptr, &hdu)?.clone();
    let pixels: Vec<f64> = fits_get_image(&mut fptr, &hdu)?;
    let bad_shape = || {
        let caller = std::panic::Location::caller();
        FitsError::BadImageShape {
            shape: shape.clone(),
            fits_filename: file.to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    };
    // fitsio gives the shape slowest axis first.
    let data = match shape.as_slice() {
        &[ny, nx] => CubeData::Single(
            Array3::from_shape_vec((1, ny, nx), pixels).map_err(|_| bad_shape())?,
        ),
        &[n_frames, ny, nx] => CubeData::Single(
            Array3::from_shape_vec((n_frames, ny, nx), pixels).map_err(|_| bad_shape())?,
        ),
        &[n_wl, n_frames, ny, nx] => CubeData::Spectral(
            Array4::from_shape_vec((n_wl, n_frames, ny, nx), pixels).map_err(|_| bad_shape())?,
        ),
        _ => return Err(bad_shape()),
    };
    debug!("Image shape: {shape:?}; {} header cards", header.len());

    Ok(ImageCube {
        data,
        header,
        file: file.to_path_buf(),
    })
}

/// Open a fits file.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::open(file.as_ref()).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Create a new fits file. The file must not already exist.
#[track_caller]
pub(crate) fn fits_create<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::create(file.as_ref()).open().map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Open a fits file's HDU.
#[track_caller]
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    fits_fptr.hdu(hdu_description).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{hdu_description}").into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
#[track_caller]
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(e) => match &e {
            fitsio::errors::Error::Fits(fe) if matches!(fe.status, 202 | 204) => return Ok(None),
            _ => {
                let caller = std::panic::Location::caller();
                return Err(FitsError::Fitsio {
                    fits_error: Box::new(e),
                    fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                    hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
                    source_file: caller.file(),
                    source_line: caller.line(),
                    source_column: caller.column(),
                });
            }
        },
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => {
            let caller = std::panic::Location::caller();
            Err(FitsError::Parse {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
#[track_caller]
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    match fits_get_optional_key(fits_fptr, hdu, keyword) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            let caller = std::panic::Location::caller();
            Err(FitsError::MissingKey {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
        Err(error) => Err(error),
    }
}

/// Get a column from a fits file's HDU.
#[track_caller]
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<T>, FitsError> {
    hdu.read_col(fits_fptr, keyword).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Read a column whose cells hold `repeat` doubles. The values come out row
/// by row.
#[track_caller]
pub(crate) fn fits_get_repeating_f64_col(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    repeat: usize,
) -> Result<Vec<f64>, FitsError> {
    fits_get_raw_col(fits_fptr, hdu, keyword, repeat, TDOUBLE)
}

/// Read a column whose cells hold `repeat` integers.
#[track_caller]
pub(crate) fn fits_get_repeating_i32_col(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    repeat: usize,
) -> Result<Vec<i32>, FitsError> {
    fits_get_raw_col(fits_fptr, hdu, keyword, repeat, TINT)
}

/// Read a logical (`L`) column.
#[track_caller]
pub(crate) fn fits_get_logical_col(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<bool>, FitsError> {
    let raw: Vec<c_char> = fits_get_raw_col(fits_fptr, hdu, keyword, 1, TLOGICAL)?;
    Ok(raw.into_iter().map(|b| b != 0).collect())
}

/// Write a logical (`L`) column. fitsio can only write numbers, which
/// cfitsio refuses to put into logical columns.
#[track_caller]
pub(crate) fn fits_write_logical_col(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    values: &[bool],
) -> Result<(), FitsError> {
    let caller = std::panic::Location::caller();
    let i_col = fits_get_col_num(fits_fptr, hdu, keyword, caller)?;
    let mut raw: Vec<c_char> = values.iter().map(|&b| b as c_char).collect();
    let mut status = 0;
    unsafe {
        // ffpcl = fits_write_col
        fitsio_sys::ffpcl(
            fits_fptr.as_raw(),
            TLOGICAL,
            i_col,
            1,
            1,
            raw.len() as i64,
            raw.as_mut_ptr().cast(),
            &mut status,
        );
    }
    check_status(fits_fptr, hdu, status, caller)
}

/// Get the shape of the image on the supplied FITS file pointer and HDU,
/// slowest axis first.
#[track_caller]
pub(crate) fn fits_get_image_shape<'a>(
    fits_fptr: &FitsFile,
    hdu: &'a FitsHdu,
) -> Result<&'a Vec<usize>, FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotImage {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Given a FITS file pointer and a HDU, read the associated image.
#[track_caller]
pub(crate) fn fits_get_image<T: fitsio::images::ReadImage>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<T, FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { .. } => hdu.read_image(fits_fptr).map_err(|e| {
            let caller = std::panic::Location::caller();
            FitsError::Fitsio {
                fits_error: Box::new(e),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            }
        }),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotImage {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Read every card of a HDU's header. Commentary cards (HISTORY, COMMENT and
/// blank keywords) keep their text.
#[track_caller]
pub(crate) fn fits_read_header(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<Header, FitsError> {
    let caller = std::panic::Location::caller();
    // Make sure the HDU is the current one.
    let hdu = fits_open_hdu(fits_fptr, hdu.number)?;

    let mut status = 0;
    let mut num_keys = 0;
    let mut num_free = 0;
    unsafe {
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(
            fits_fptr.as_raw(),
            &mut num_keys,
            &mut num_free,
            &mut status,
        );
    }
    check_status(fits_fptr, &hdu, status, caller)?;

    let mut header = Header::new();
    let mut keyname = [0 as c_char; CARD_BUFFER_LEN];
    let mut value = [0 as c_char; CARD_BUFFER_LEN];
    let mut comment = [0 as c_char; CARD_BUFFER_LEN];
    for i_key in 1..=num_keys {
        unsafe {
            // ffgkyn = fits_read_keyn
            fitsio_sys::ffgkyn(
                fits_fptr.as_raw(),
                i_key,
                keyname.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            );
        }
        check_status(fits_fptr, &hdu, status, caller)?;

        let (keyname, value, comment) = unsafe {
            (
                CStr::from_ptr(keyname.as_ptr()).to_string_lossy(),
                CStr::from_ptr(value.as_ptr()).to_string_lossy(),
                CStr::from_ptr(comment.as_ptr()).to_string_lossy(),
            )
        };
        match keyname.as_ref() {
            "END" => break,
            "HISTORY" | "COMMENT" | "" => header.push(keyname.as_ref(), comment.as_ref()),
            // Continuations are read with the card they continue.
            "CONTINUE" => (),
            _ => {
                let value = if value.trim_end().ends_with("&'") {
                    fits_get_long_string(fits_fptr, &hdu, &keyname, caller)?
                } else {
                    value.to_string()
                };
                // cfitsio drops the HIERARCH of long keywords.
                if keyname.len() > 8 || keyname.contains(' ') {
                    header.push(format!("HIERARCH {keyname}"), value);
                } else {
                    header.push(keyname.as_ref(), value);
                }
            }
        }
    }

    Ok(header)
}

/// Read a string that may be continued over many cards.
fn fits_get_long_string(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    caller: &'static std::panic::Location<'static>,
) -> Result<String, FitsError> {
    let keyword = CString::new(keyword)
        .expect("fits_get_long_string: CString::new() failed for keyword");
    let mut status = 0;
    let mut long_string_ptr = ptr::null_mut();
    unsafe {
        // ffgkls = fits_read_key_longstr
        fitsio_sys::ffgkls(
            fits_fptr.as_raw(),
            keyword.as_ptr(),
            &mut long_string_ptr,
            ptr::null_mut(),
            &mut status,
        );
    }
    check_status(fits_fptr, hdu, status, caller)?;
    let long_string = unsafe {
        let s = CStr::from_ptr(long_string_ptr).to_string_lossy().to_string();
        // fffree = fits_free_memory
        fitsio_sys::fffree(long_string_ptr.cast(), &mut 0);
        s
    };
    Ok(long_string)
}

/// Write the cards of a header into a HDU. Cards for which `skip` is true
/// are left out. Numbers and logicals are written as they appear, any other
/// value as a (possibly continued) string. Long keywords use the HIERARCH
/// convention.
#[track_caller]
pub(crate) fn fits_write_header<F: Fn(&str) -> bool>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    header: &Header,
    skip: F,
) -> Result<(), FitsError> {
    let caller = std::panic::Location::caller();
    let hdu = fits_open_hdu(fits_fptr, hdu.number)?;

    let mut status = 0;
    for (keyword, value) in header.iter() {
        if skip(keyword) {
            continue;
        }
        // Keywords or values with nuls can't be written.
        let (Ok(c_keyword), Ok(c_value)) =
            (CString::new(keyword.as_str()), CString::new(value.as_str()))
        else {
            trace!("Not writing header card {keyword}");
            continue;
        };
        match keyword.as_str() {
            "HISTORY" | "COMMENT" | "" => {
                for line in value.lines() {
                    let Ok(line) = CString::new(line) else {
                        continue;
                    };
                    unsafe {
                        if keyword == "HISTORY" {
                            // ffphis = fits_write_history
                            fitsio_sys::ffphis(fits_fptr.as_raw(), line.as_ptr(), &mut status);
                        } else {
                            // ffpcom = fits_write_comment
                            fitsio_sys::ffpcom(fits_fptr.as_raw(), line.as_ptr(), &mut status);
                        }
                    }
                    check_status(fits_fptr, &hdu, status, caller)?;
                }
            }

            _ if is_raw_value(value) => {
                let mut card = [0 as c_char; CARD_BUFFER_LEN];
                unsafe {
                    // ffmkky = fits_make_key
                    fitsio_sys::ffmkky(
                        c_keyword.as_ptr(),
                        c_value.as_ptr() as *mut c_char,
                        ptr::null(),
                        card.as_mut_ptr(),
                        &mut status,
                    );
                    // ffprec = fits_write_record
                    fitsio_sys::ffprec(fits_fptr.as_raw(), card.as_ptr(), &mut status);
                }
                check_status(fits_fptr, &hdu, status, caller)?;
            }

            _ => {
                unsafe {
                    // ffpkls = fits_write_key_longstr
                    fitsio_sys::ffpkls(
                        fits_fptr.as_raw(),
                        c_keyword.as_ptr(),
                        c_value.as_ptr(),
                        ptr::null(),
                        &mut status,
                    );
                }
                check_status(fits_fptr, &hdu, status, caller)?;
            }
        }
    }
    Ok(())
}

/// Can this value go into a card without quotes?
fn is_raw_value(value: &str) -> bool {
    matches!(value, "T" | "F") || value.parse::<f64>().map_or(false, |v| v.is_finite())
}

#[track_caller]
fn fits_get_raw_col<T: Copy + Default>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    repeat: usize,
    data_type: i32,
) -> Result<Vec<T>, FitsError> {
    let caller = std::panic::Location::caller();
    let num_rows = match &hdu.info {
        HduInfo::TableInfo { num_rows, .. } => *num_rows,
        _ => 0,
    };
    let i_col = fits_get_col_num(fits_fptr, hdu, keyword, caller)?;
    let mut values = vec![T::default(); num_rows * repeat];
    if values.is_empty() {
        return Ok(values);
    }

    let mut status = 0;
    unsafe {
        // ffgcv = fits_read_col
        fitsio_sys::ffgcv(
            fits_fptr.as_raw(),
            data_type,
            i_col,
            1,
            1,
            values.len() as i64,
            ptr::null_mut(),
            values.as_mut_ptr().cast(),
            &mut 0,
            &mut status,
        );
    }
    check_status(fits_fptr, hdu, status, caller)?;
    Ok(values)
}

fn fits_get_col_num(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    caller: &'static std::panic::Location<'static>,
) -> Result<i32, FitsError> {
    let hdu = fits_open_hdu(fits_fptr, hdu.number)?;
    let col_name = CString::new(keyword)
        .expect("fits_get_col_num: CString::new() failed for keyword")
        .into_raw();
    let mut i_col = 0;
    let mut status = 0;
    unsafe {
        // ffgcno = fits_get_colnum
        fitsio_sys::ffgcno(
            fits_fptr.as_raw(), /* I - FITS file pionter                       */
            1,                  /* I - case sensitive string comparison? 0=no  */
            col_name,           /* I - input name of column (w/wildcards)      */
            &mut i_col,         /* O - number of the named column; 1=first col */
            &mut status,        /* IO - error status                           */
        );
        drop(CString::from_raw(col_name));
    }
    check_status(fits_fptr, &hdu, status, caller)?;
    Ok(i_col)
}

fn check_status(
    fits_fptr: &FitsFile,
    hdu: &FitsHdu,
    status: i32,
    caller: &'static std::panic::Location<'static>,
) -> Result<(), FitsError> {
    fitsio::errors::check_status(status).map_err(|e| FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    })
}
