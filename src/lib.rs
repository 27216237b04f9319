pub mod aggregate;
mod config;
mod dataset;
pub mod dimension;
mod error;
pub mod geo;
pub mod patient;
mod table;
mod util;

pub use anyhow::{Context, Error};
use chrono::NaiveDate;
use itertools::Either;
use qu::ick_use::*;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt, io, iter,
    ops::Deref,
    path::Path,
    sync::Arc,
};

pub use crate::{
    aggregate::{AggregateRow, CountQuery, EventKind, GeoFilter, Location},
    config::Sources,
    dataset::Dataset,
    error::{DataError, LocationNotFound},
    geo::{AddressBook, Coordinates, GeoCodeRecord, GeoCodes, GeoLevel},
    patient::{PatientFields, PatientRecord},
    table::{save_csv, RawTable},
    util::{header, title_case},
};
use crate::{
    table::Column,
    util::{opt_date, optional_string},
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

/// Columns every case table must have. Several names are accepted because the DOH data drops
/// renamed columns between releases.
const CASE_COLUMNS: &[Column] = &[
    Column {
        name: "case code",
        accepted: &["CaseCode"],
    },
    Column {
        name: "date confirmed",
        accepted: &["DateRepConf", "DateConfirmed"],
    },
    Column {
        name: "date removed",
        accepted: &["DateRepRem", "DateRemoved"],
    },
    Column {
        name: "removal type",
        accepted: &["RemovalType"],
    },
    Column {
        name: "region",
        accepted: &["RegionRes", "Region"],
    },
    Column {
        name: "province",
        accepted: &["ProvRes", "Province"],
    },
    Column {
        name: "city",
        accepted: &["CityRes", "City", "CityMunRes"],
    },
    Column {
        name: "municipality",
        accepted: &["MunRes", "Municipality", "CityMunRes"],
    },
];

#[derive(Debug, Clone, Deserialize)]
struct CaseRaw {
    #[serde(rename = "CaseCode")]
    case_code: ArcStr,
    #[serde(
        rename = "DateRepConf",
        alias = "DateConfirmed",
        deserialize_with = "opt_date"
    )]
    date_confirmed: Option<NaiveDate>,
    #[serde(
        rename = "DateRepRem",
        alias = "DateRemoved",
        deserialize_with = "opt_date"
    )]
    date_removed: Option<NaiveDate>,
    #[serde(rename = "RemovalType", deserialize_with = "optional_string")]
    removal_type: Option<ArcStr>,
    #[serde(
        rename = "RegionRes",
        alias = "Region",
        deserialize_with = "optional_string"
    )]
    region: Option<ArcStr>,
    #[serde(
        rename = "ProvRes",
        alias = "Province",
        deserialize_with = "optional_string"
    )]
    province: Option<ArcStr>,
    #[serde(
        default,
        rename = "CityRes",
        alias = "City",
        deserialize_with = "optional_string"
    )]
    city: Option<ArcStr>,
    #[serde(
        default,
        rename = "MunRes",
        alias = "Municipality",
        deserialize_with = "optional_string"
    )]
    municipality: Option<ArcStr>,
    /// The published data drops have one column for both cities and municipalities.
    #[serde(
        default,
        rename = "CityMunRes",
        deserialize_with = "optional_string"
    )]
    city_municipality: Option<ArcStr>,
}

/// A row in the case information dataset.
///
/// Empty fields are `None`. Nothing else about the source row is validated or repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub case_code: ArcStr,
    pub date_confirmed: Option<NaiveDate>,
    /// Only meaningful when `removal_type` is set.
    pub date_removed: Option<NaiveDate>,
    pub removal_type: Option<RemovalType>,
    pub region: Option<ArcStr>,
    pub province: Option<ArcStr>,
    pub city: Option<ArcStr>,
    pub municipality: Option<ArcStr>,
}

impl From<CaseRaw> for CaseRecord {
    fn from(from: CaseRaw) -> Self {
        Self {
            case_code: from.case_code,
            date_confirmed: from.date_confirmed,
            date_removed: from.date_removed,
            removal_type: from.removal_type.map(RemovalType::from),
            region: from.region,
            province: from.province,
            city: from.city.or_else(|| from.city_municipality.clone()),
            municipality: from.municipality.or(from.city_municipality),
        }
    }
}

impl CaseRecord {
    /// A case that has neither died nor recovered.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.removal_type,
            Some(RemovalType::Died) | Some(RemovalType::Recovered)
        )
    }

    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Confirmed => self.date_confirmed,
            DateField::Removed => self.date_removed,
        }
    }

    pub fn geo(&self, field: GeoField) -> Option<&str> {
        match field {
            GeoField::Region => self.region.as_deref(),
            GeoField::Province => self.province.as_deref(),
            GeoField::City => self.city.as_deref(),
            GeoField::Municipality => self.municipality.as_deref(),
        }
    }

    /// The city if there is one, otherwise the municipality.
    pub fn city_municipality(&self) -> Option<&str> {
        self.city.as_deref().or(self.municipality.as_deref())
    }
}

/// The parsed list of cases, with a pre-built index for the `case_code` field.
///
/// Rows are kept in file order, and are never merged or deduplicated.
#[derive(Clone)]
pub struct Cases {
    els: Arc<Vec<CaseRecord>>,
    code_idx: BTreeMap<ArcStr, Vec<usize>>,
}

impl Cases {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw: Vec<CaseRaw> = table::load_rows(path, CASE_COLUMNS)?;
        let cases = Self::new(raw.into_iter().map(Into::into).collect());
        event!(
            Level::INFO,
            "loaded {} cases from \"{}\"",
            cases.len(),
            path.display()
        );
        Ok(cases)
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self, DataError> {
        let raw: Vec<CaseRaw> = table::read_rows(reader, CASE_COLUMNS, None)?;
        Ok(Self::new(raw.into_iter().map(Into::into).collect()))
    }

    /// All cases with the given code. Codes are not guaranteed unique.
    pub fn find_by_code(&self, code: &str) -> impl Iterator<Item = &CaseRecord> + '_ {
        let idxs = match self.code_idx.get(code) {
            Some(idxs) => idxs,
            None => return Either::Left(iter::empty()),
        };
        Either::Right(
            idxs.iter()
                .map(|idx| self.els.get(*idx).expect("inconsistent case code index")),
        )
    }

    fn new(els: Vec<CaseRecord>) -> Self {
        let mut this = Cases {
            els: Arc::new(els),
            code_idx: BTreeMap::new(),
        };
        this.rebuild_index();
        this
    }

    fn rebuild_index(&mut self) {
        self.code_idx.clear();
        for (idx, case) in self.els.iter().enumerate() {
            self.code_idx
                .entry(case.case_code.clone())
                .or_insert_with(Vec::new)
                .push(idx);
        }
    }
}

impl fmt::Debug for Cases {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cases").field("els", &self.els).finish()
    }
}

impl Deref for Cases {
    type Target = [CaseRecord];
    fn deref(&self) -> &Self::Target {
        &*self.els
    }
}

impl<'a> IntoIterator for &'a Cases {
    type IntoIter = <&'a [CaseRecord] as IntoIterator>::IntoIter;
    type Item = &'a CaseRecord;
    fn into_iter(self) -> Self::IntoIter {
        self.els.iter()
    }
}

impl FromIterator<CaseRecord> for Cases {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = CaseRecord>,
    {
        Self::new(iter.into_iter().collect())
    }
}

// Sub-types

/// How a case left the active count. Matching against the source text is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemovalType {
    Died,
    Recovered,
    /// Anything else in the column. These cases still count as active.
    Other(ArcStr),
}

impl From<ArcStr> for RemovalType {
    fn from(from: ArcStr) -> Self {
        match &*from {
            "Died" => RemovalType::Died,
            "Recovered" => RemovalType::Recovered,
            _ => RemovalType::Other(from),
        }
    }
}

impl fmt::Display for RemovalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RemovalType::Died => f.write_str("Died"),
            RemovalType::Recovered => f.write_str("Recovered"),
            RemovalType::Other(other) => f.write_str(other),
        }
    }
}

/// Which date column of a case to report against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DateField {
    Confirmed,
    Removed,
}

/// The administrative levels a case is located by.
///
/// Declaration order is filter precedence: when several are supplied, the first wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeoField {
    Region,
    Province,
    City,
    Municipality,
}

impl GeoField {
    /// Column heading used when reporting counts for this level.
    pub fn label(self) -> &'static str {
        match self {
            GeoField::Region => "Region",
            GeoField::Province => "Province",
            GeoField::City => "City",
            GeoField::Municipality => "Municipality",
        }
    }
}

impl fmt::Display for GeoField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeoField::Region => f.write_str("region"),
            GeoField::Province => f.write_str("province"),
            GeoField::City => f.write_str("city"),
            GeoField::Municipality => f.write_str("municipality"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Cases, DataError, GeoField, RemovalType};
    use chrono::NaiveDate;
    use std::io;

    const CASES: &str = "\
CaseCode,DateRepConf,DateRepRem,RemovalType,RegionRes,ProvRes,CityMunRes
C1,2020-04-01,,,NCR,,CITY OF MANILA
C2,2020-04-01,2020-04-10,Recovered,Region III,Bulacan,MALOLOS
C1,2020-04-02,2020-04-05,Died,NCR,,
";

    #[test]
    fn load_cases() {
        let cases = Cases::from_reader(io::Cursor::new(CASES)).unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(
            cases[0].date_confirmed,
            NaiveDate::from_ymd_opt(2020, 4, 1)
        );
        assert_eq!(cases[0].date_removed, None);
        assert_eq!(cases[0].removal_type, None);
        assert_eq!(cases[0].province, None);
        assert_eq!(cases[0].geo(GeoField::City), Some("CITY OF MANILA"));
        assert_eq!(cases[0].geo(GeoField::Municipality), Some("CITY OF MANILA"));
        assert_eq!(cases[1].removal_type, Some(RemovalType::Recovered));
        assert_eq!(cases[2].city_municipality(), None);
        assert!(cases[0].is_active());
        assert!(!cases[1].is_active());
        assert!(!cases[2].is_active());
    }

    #[test]
    fn other_removal_types_are_active() {
        let input = "\
CaseCode,DateRepConf,DateRepRem,RemovalType,RegionRes,ProvRes,CityRes,MunRes
C1,2020-04-01,,died,NCR,,,
";
        let cases = Cases::from_reader(io::Cursor::new(input)).unwrap();
        assert_eq!(cases[0].removal_type, Some(RemovalType::Other("died".into())));
        assert!(cases[0].is_active());
    }

    #[test]
    fn index_by_code() {
        let cases = Cases::from_reader(io::Cursor::new(CASES)).unwrap();
        assert_eq!(cases.find_by_code("C1").count(), 2);
        assert_eq!(cases.find_by_code("C2").count(), 1);
        assert_eq!(cases.find_by_code("C9").count(), 0);
    }

    #[test]
    fn bad_date_is_format_error() {
        let input = "\
CaseCode,DateRepConf,DateRepRem,RemovalType,RegionRes,ProvRes,CityMunRes
C1,2020-04-01,,,NCR,,
C2,04/02/2020,,,NCR,,
";
        let err = Cases::from_reader(io::Cursor::new(input)).unwrap_err();
        assert!(matches!(err, DataError::Format { row: 2, .. }), "{:?}", err);
    }

    #[test]
    fn missing_column_rejected_before_rows() {
        let input = "CaseCode,DateRepConf,DateRepRem,RemovalType,RegionRes,CityMunRes\n";
        let err = Cases::from_reader(io::Cursor::new(input)).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn {
                column: "province",
                ..
            }
        ));
    }
}
