//! Connectivity tool ascii product parser.
//!
//! The products start with a fixed-size preamble followed by one row per
//! traced footpoint. Rows are whitespace separated; the columns of
//! interest are the wind category token, the flux density, and the
//! Carrington latitude and longitude.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ConnectivityPoint, ConnectivitySet, QuantizedTime, WindCategory};

/// Preamble lines before the footpoint rows.
const HEADER_LINES: usize = 20;

const COL_CATEGORY: usize = 0;
const COL_DENSITY: usize = 2;
const COL_LAT: usize = 4;
const COL_LON: usize = 5;

/// File name of the product for a quantized timestamp.
pub fn connectivity_file_name(time: QuantizedTime) -> String {
    format!(
        "SOLO_PARKER_PFSS_SCTIME_ADAPT_SCIENCE_{}_fileconnectivity.ascii",
        time.file_stamp()
    )
}

fn field<'a>(
    fields: &[&'a str],
    col: usize,
    line: usize,
    what: &str,
) -> AnalysisResult<&'a str> {
    fields.get(col).copied().ok_or_else(|| AnalysisError::Parse {
        line,
        message: format!("missing {} column {}", what, col),
    })
}

fn float_field(fields: &[&str], col: usize, line: usize, what: &str) -> AnalysisResult<f64> {
    let raw = field(fields, col, line, what)?;
    raw.parse::<f64>().map_err(|_| AnalysisError::Parse {
        line,
        message: format!("invalid {} value {:?}", what, raw),
    })
}

/// Parse one product body into a connectivity set.
///
/// Rows with an unknown category token are skipped; the products carry
/// auxiliary trace classes the analysis does not use. Malformed numeric
/// fields are an error.
pub fn parse_connectivity(text: &str, time: QuantizedTime) -> AnalysisResult<ConnectivitySet> {
    let mut points = Vec::new();

    for (index, raw) in text.lines().enumerate().skip(HEADER_LINES) {
        let line = index + 1;
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        let Some(category) = WindCategory::from_token(field(&fields, COL_CATEGORY, line, "category")?)
        else {
            continue;
        };
        let density = float_field(&fields, COL_DENSITY, line, "density")?;
        let lat = float_field(&fields, COL_LAT, line, "latitude")?;
        let lon = float_field(&fields, COL_LON, line, "longitude")?;

        points.push(ConnectivityPoint {
            category,
            density,
            lat,
            lon,
        });
    }

    Ok(ConnectivitySet::new(time, points))
}
