//! The vocabularies the case data is reported against: which dates have cases, and which
//! places do (or do not).
use crate::{title_case, ArcStr, CaseRecord, DateField, GeoCodeRecord, GeoField, GeoLevel};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Title casing turns `CITY OF` into `City Of`.
static CITY_OF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^City Of ").unwrap());

/// Distinct dates present in the given date column, ascending. Empty dates are skipped.
pub fn unique_dates(records: &[CaseRecord], field: DateField) -> Vec<NaiveDate> {
    records
        .iter()
        .filter_map(|rec| rec.date(field))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct non-empty values of a geographic column, ascending.
///
/// Values are compared exactly, so `Bulacan` and `BULACAN` both appear if both are in the data.
pub fn distinct_values(records: &[CaseRecord], field: GeoField) -> Vec<ArcStr> {
    records
        .iter()
        .filter_map(|rec| match field {
            GeoField::Region => rec.region.clone(),
            GeoField::Province => rec.province.clone(),
            GeoField::City => rec.city.clone(),
            GeoField::Municipality => rec.municipality.clone(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Units in the master code list with no case in the data, ascending.
///
/// A unit at `level` is absent if no case has `field` equal to its name, ignoring case. Names
/// are returned title cased, with a leading `City Of` written `City of`.
pub fn absent_units(
    records: &[CaseRecord],
    geo_codes: &[GeoCodeRecord],
    level: GeoLevel,
    field: GeoField,
) -> Vec<String> {
    let present: HashSet<String> = records
        .iter()
        .filter_map(|rec| rec.geo(field))
        .map(str::to_lowercase)
        .collect();

    geo_codes
        .iter()
        .filter(|code| code.level == level && !present.contains(&code.name.to_lowercase()))
        .map(|code| unit_name(&code.name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn unit_name(raw: &str) -> String {
    CITY_OF.replace(&title_case(raw), "City of ").into_owned()
}
