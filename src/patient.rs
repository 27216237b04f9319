//! A per-case view of the data, optionally placed on a map.
use crate::{AddressBook, ArcStr, CaseRecord};
use chrono::NaiveDate;
use qu::ick_use::*;
use serde::Serialize;

/// Which fields to include in a [`PatientRecord`]. The case code is always included.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
    /// The confirmation date. Also sorts the output by date.
    pub date: bool,
    pub city_municipality: bool,
    pub province: bool,
    /// Approximate coordinates of the city/municipality.
    pub coordinates: bool,
}

/// One case.
///
/// For the optional fields, the outer `Option` is whether the field was asked for and the inner
/// one whether the case has a value. Fields that were not asked for are left out when
/// serialized; fields that were asked for but have no value are written as null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    #[serde(rename = "CaseCode")]
    pub case_code: ArcStr,
    #[serde(rename = "Date", skip_serializing_if = "Option::is_none")]
    pub date: Option<Option<NaiveDate>>,
    #[serde(rename = "CityMun", skip_serializing_if = "Option::is_none")]
    pub city_municipality: Option<Option<ArcStr>>,
    #[serde(rename = "Province", skip_serializing_if = "Option::is_none")]
    pub province: Option<Option<ArcStr>>,
    #[serde(rename = "Latitude", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Option<f64>>,
    #[serde(rename = "Longitude", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Option<f64>>,
}

/// Build one record per case.
///
/// `addresses` is only consulted when coordinates are asked for. A case whose address is not
/// in the book gets null coordinates. Cases without a date sort after those with one.
pub fn project(
    records: &[CaseRecord],
    fields: PatientFields,
    addresses: Option<&AddressBook>,
) -> Vec<PatientRecord> {
    let mut misses = 0;
    let mut out: Vec<PatientRecord> = records
        .iter()
        .map(|case| {
            let coordinates = if fields.coordinates {
                let found = addresses.and_then(|book| book.locate(case));
                if found.is_none() {
                    misses += 1;
                }
                Some(found)
            } else {
                None
            };
            PatientRecord {
                case_code: case.case_code.clone(),
                date: fields.date.then(|| case.date_confirmed),
                city_municipality: fields
                    .city_municipality
                    .then(|| case.city_municipality().map(ArcStr::from)),
                province: fields.province.then(|| case.province.clone()),
                latitude: coordinates.map(|c| c.map(|c| c.latitude)),
                longitude: coordinates.map(|c| c.map(|c| c.longitude)),
            }
        })
        .collect();

    if fields.coordinates && misses > 0 {
        event!(
            Level::DEBUG,
            "{} of {} cases have no known coordinates",
            misses,
            records.len()
        );
    }
    if fields.date {
        out.sort_by_key(|rec| {
            let date = rec.date.flatten();
            (date.is_none(), date)
        });
    }
    out
}

#[cfg(test)]
mod test {
    use super::{project, PatientFields};
    use crate::{AddressBook, Cases, Coordinates};
    use chrono::NaiveDate;
    use std::io;

    const CASES: &str = "\
CaseCode,DateRepConf,DateRepRem,RemovalType,RegionRes,ProvRes,CityMunRes
C1,2020-04-03,,,Region III,Bulacan,Malolos
C2,,,,NCR,,Manila
C3,2020-04-01,,,Region III,Bulacan,Meycauayan
";

    fn cases() -> Cases {
        Cases::from_reader(io::Cursor::new(CASES)).unwrap()
    }

    fn book() -> AddressBook {
        [(
            "Malolos, Bulacan".to_string(),
            Coordinates {
                latitude: 14.85,
                longitude: 120.81,
            },
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn code_only() {
        let rows = project(&cases(), PatientFields::default(), None);
        let codes: Vec<&str> = rows.iter().map(|r| &*r.case_code).collect();
        assert_eq!(codes, ["C1", "C2", "C3"]);
        assert!(rows.iter().all(|r| r.date.is_none() && r.latitude.is_none()));
        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap(),
            serde_json::json!({"CaseCode": "C1"})
        );
    }

    #[test]
    fn sorted_by_date() {
        let fields = PatientFields {
            date: true,
            ..PatientFields::default()
        };
        let rows = project(&cases(), fields, None);
        let codes: Vec<&str> = rows.iter().map(|r| &*r.case_code).collect();
        assert_eq!(codes, ["C3", "C1", "C2"]);
        assert_eq!(rows[0].date, Some(NaiveDate::from_ymd_opt(2020, 4, 1)));
        assert_eq!(rows[2].date, Some(None));
    }

    #[test]
    fn coordinate_miss_is_null() {
        let fields = PatientFields {
            city_municipality: true,
            province: true,
            coordinates: true,
            ..PatientFields::default()
        };
        let rows = project(&cases(), fields, Some(&book()));
        assert_eq!(rows[0].latitude, Some(Some(14.85)));
        assert_eq!(rows[0].longitude, Some(Some(120.81)));
        assert_eq!(rows[1].latitude, Some(None));
        assert_eq!(rows[2].longitude, Some(None));
        assert_eq!(
            serde_json::to_value(&rows[1]).unwrap(),
            serde_json::json!({
                "CaseCode": "C2",
                "CityMun": "Manila",
                "Province": null,
                "Latitude": null,
                "Longitude": null
            })
        );
    }
}
