//! CSV loading. Rows are read as optional strings, then coerced and
//! validated one column at a time so errors name the row and column.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

use crate::config::DataConfig;
use crate::error::DataError;

use super::records::PermitRecord;

#[derive(Debug, Deserialize)]
struct PermitRow {
    year: Option<String>,
    #[serde(alias = "permit_count", alias = "permitCount")]
    permits: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DemolitionRow {
    #[serde(alias = "demolition_date", alias = "demolitionDate")]
    date_of_demolition: Option<String>,
    locality: Option<String>,
    #[serde(default)]
    locality_cleaned: Option<String>,
    district: Option<String>,
    housing_units: Option<String>,
    #[serde(alias = "peopleHomeless")]
    people_left_homeless: Option<String>,
    #[serde(alias = "minorsHomeless")]
    minors_left_homeless: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<String>,
    #[serde(alias = "longitude", alias = "lon")]
    long: Option<String>,
}

/// A validated demolition row before classification assigns its flags.
#[derive(Debug, Clone, PartialEq)]
pub struct DemolitionFields {
    pub id: u32,
    pub locality: String,
    pub locality_cleaned: Option<String>,
    pub district: String,
    pub housing_units: u32,
    pub people_homeless: u32,
    pub minors_homeless: u32,
    pub demolition_date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
}

fn open(path: &Path) -> Result<File, DataError> {
    File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_permits(path: &Path, filter: &DataConfig) -> Result<Vec<PermitRecord>, DataError> {
    read_permits(open(path)?, path, filter)
}

pub fn load_demolitions(path: &Path) -> Result<Vec<DemolitionFields>, DataError> {
    read_demolitions(open(path)?, path)
}

/// Parse permits, keep the configured year window and sort by year.
pub fn read_permits<R: Read>(
    reader: R,
    source: &Path,
    filter: &DataConfig,
) -> Result<Vec<PermitRecord>, DataError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut permits = Vec::new();
    let mut seen = BTreeSet::new();

    for (index, row) in csv.deserialize::<PermitRow>().enumerate() {
        let row = row.map_err(|e| csv_error(source, e))?;
        let line = index + 1;
        let year = parse_int(source, line, "year", row.year.as_deref())?;
        let permit_count = parse_count(source, line, "permits", row.permits.as_deref())?;
        let year = i32::try_from(year).map_err(|_| DataError::BadNumber {
            path: source.to_path_buf(),
            row: line,
            column: "year",
            value: year.to_string(),
        })?;

        if year <= filter.min_year_exclusive || year > filter.max_year {
            continue;
        }
        if !seen.insert(year) {
            return Err(DataError::DuplicateYear { year });
        }
        permits.push(PermitRecord { year, permit_count });
    }

    permits.sort_by_key(|p| p.year);
    debug!("loaded {} permit years from {}", permits.len(), source.display());
    Ok(permits)
}

/// Parse every demolition row. Ids are assigned from the row position, before
/// any filtering, so they stay stable whatever window is applied later.
pub fn read_demolitions<R: Read>(
    reader: R,
    source: &Path,
) -> Result<Vec<DemolitionFields>, DataError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();

    for (index, row) in csv.deserialize::<DemolitionRow>().enumerate() {
        let row = row.map_err(|e| csv_error(source, e))?;
        let line = index + 1;
        rows.push(DemolitionFields {
            id: index as u32,
            locality: required(source, line, "locality", row.locality)?,
            locality_cleaned: row.locality_cleaned.filter(|s| !s.is_empty()),
            district: required(source, line, "district", row.district)?,
            housing_units: parse_count(source, line, "housing_units", row.housing_units.as_deref())?,
            people_homeless: parse_count(
                source,
                line,
                "people_left_homeless",
                row.people_left_homeless.as_deref(),
            )?,
            minors_homeless: parse_count(
                source,
                line,
                "minors_left_homeless",
                row.minors_left_homeless.as_deref(),
            )?,
            demolition_date: parse_date(
                source,
                line,
                "date_of_demolition",
                row.date_of_demolition.as_deref(),
            )?,
            latitude: parse_float(source, line, "lat", row.lat.as_deref())?,
            longitude: parse_float(source, line, "long", row.long.as_deref())?,
        });
    }

    debug!("loaded {} demolition rows from {}", rows.len(), source.display());
    Ok(rows)
}

fn csv_error(source: &Path, e: csv::Error) -> DataError {
    DataError::Csv {
        path: source.to_path_buf(),
        source: e,
    }
}

fn required(
    source: &Path,
    row: usize,
    column: &'static str,
    value: Option<String>,
) -> Result<String, DataError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DataError::MissingField {
            path: source.to_path_buf(),
            row,
            column,
        }),
    }
}

fn present<'a>(
    source: &Path,
    row: usize,
    column: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, DataError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DataError::MissingField {
            path: source.to_path_buf(),
            row,
            column,
        }),
    }
}

fn bad_number(source: &Path, row: usize, column: &'static str, value: &str) -> DataError {
    DataError::BadNumber {
        path: source.to_path_buf(),
        row,
        column,
        value: value.to_string(),
    }
}

fn parse_float(
    source: &Path,
    row: usize,
    column: &'static str,
    value: Option<&str>,
) -> Result<f64, DataError> {
    let raw = present(source, row, column, value)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(bad_number(source, row, column, raw)),
    }
}

fn parse_int(
    source: &Path,
    row: usize,
    column: &'static str,
    value: Option<&str>,
) -> Result<i64, DataError> {
    let raw = present(source, row, column, value)?;
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    // Spreadsheet exports write integers as `12.0`.
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(bad_number(source, row, column, raw)),
    }
}

fn parse_count(
    source: &Path,
    row: usize,
    column: &'static str,
    value: Option<&str>,
) -> Result<u32, DataError> {
    let v = parse_int(source, row, column, value)?;
    u32::try_from(v).map_err(|_| bad_number(source, row, column, &v.to_string()))
}

fn parse_date(
    source: &Path,
    row: usize,
    column: &'static str,
    value: Option<&str>,
) -> Result<NaiveDate, DataError> {
    let raw = present(source, row, column, value)?;
    // Accept full timestamps by reading only the calendar date.
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| DataError::BadDate {
        path: source.to_path_buf(),
        row,
        column,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn permits_are_windowed_and_sorted() {
        let csv = "year,permits\n2012,3\n2009,40\n2011,5\n2021,8\n";
        let permits = read_permits(csv.as_bytes(), src(), &DataConfig::default()).unwrap();
        assert_eq!(
            permits,
            vec![
                PermitRecord { year: 2011, permit_count: 5 },
                PermitRecord { year: 2012, permit_count: 3 },
            ]
        );
    }

    #[test]
    fn permit_count_alias_is_accepted() {
        let csv = "year,permit_count\n2015,2.0\n";
        let permits = read_permits(csv.as_bytes(), src(), &DataConfig::default()).unwrap();
        assert_eq!(permits[0].permit_count, 2);
    }

    #[test]
    fn duplicate_year_is_rejected() {
        let csv = "year,permits\n2015,2\n2015,3\n";
        let err = read_permits(csv.as_bytes(), src(), &DataConfig::default()).unwrap_err();
        assert!(matches!(err, DataError::DuplicateYear { year: 2015 }));
    }

    #[test]
    fn malformed_number_names_row_and_column() {
        let csv = "date_of_demolition,locality,district,housing_units,people_left_homeless,minors_left_homeless,lat,long\n\
                   2015-02-03,Yatta,Hebron,2,5,1,31.4,35.0\n\
                   2016-02-03,Yatta,Hebron,two,5,1,31.4,35.0\n";
        let err = read_demolitions(csv.as_bytes(), src()).unwrap_err();
        match err {
            DataError::BadNumber { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "housing_units");
                assert_eq!(value, "two");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_coordinates_fail_fast() {
        let csv = "date_of_demolition,locality,district,housing_units,people_left_homeless,minors_left_homeless,lat,long\n\
                   2015-02-03,Yatta,Hebron,2,5,1,,35.0\n";
        let err = read_demolitions(csv.as_bytes(), src()).unwrap_err();
        assert!(matches!(err, DataError::MissingField { column: "lat", row: 1, .. }));
    }

    #[test]
    fn demolition_rows_parse_with_timestamps() {
        let csv = "date_of_demolition,locality,locality_cleaned,district,housing_units,people_left_homeless,minors_left_homeless,lat,long\n\
                   2021-02-01T00:00:00,Kh. Humsah,Khirbet Humsah,Tubas,3,11,6,32.2,35.5\n";
        let rows = read_demolitions(csv.as_bytes(), src()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 0);
        assert_eq!(rows[0].demolition_date, NaiveDate::from_ymd_opt(2021, 2, 1).unwrap());
        assert_eq!(rows[0].locality_cleaned.as_deref(), Some("Khirbet Humsah"));
        assert_eq!(rows[0].minors_homeless, 6);
    }
}
