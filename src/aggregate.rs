//! Daily and cumulative counts of confirmed cases, deaths and recoveries.
//!
//! Every series is built on the full date vocabulary for its date column, so a filtered series
//! has the same dates as the unfiltered one, with zero counts where the filtered place had no
//! cases that day. Running totals are accumulated oldest first, then the series is reported
//! newest first and cut to the requested number of days.
use crate::{
    dimension::{distinct_values, unique_dates},
    util::eq_ignore_case,
    ArcStr, CaseRecord, DateField, GeoField, LocationNotFound, RemovalType,
};
use chrono::NaiveDate;
use qu::ick_use::*;
use serde::{ser::SerializeStruct, Serialize, Serializer};
use std::collections::BTreeMap;

/// Label for a series that is not filtered by place.
pub const ALL_LOCATIONS: &str = "All locations";

/// What is being counted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Counted on the confirmation date.
    Confirmed,
    /// Counted on the removal date.
    Died,
    /// Counted on the removal date.
    Recovered,
}

impl EventKind {
    pub fn date_field(self) -> DateField {
        match self {
            EventKind::Confirmed => DateField::Confirmed,
            EventKind::Died | EventKind::Recovered => DateField::Removed,
        }
    }

    /// `active` only restricts confirmed cases.
    fn matches(self, case: &CaseRecord, active: bool) -> bool {
        match self {
            EventKind::Confirmed => !active || case.is_active(),
            EventKind::Died => case.removal_type == Some(RemovalType::Died),
            EventKind::Recovered => case.removal_type == Some(RemovalType::Recovered),
        }
    }
}

/// A single place to filter on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoFilter {
    pub field: GeoField,
    pub value: String,
}

impl GeoFilter {
    fn matches(&self, case: &CaseRecord) -> bool {
        matches!(case.geo(self.field), Some(v) if eq_ignore_case(v, &self.value))
    }
}

/// Up to one value per level. Only the highest level supplied is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub region: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub municipality: Option<String>,
}

impl Location {
    /// The filter that applies: region, then province, then city, then municipality.
    pub fn filter(&self) -> Option<GeoFilter> {
        [
            (GeoField::Region, &self.region),
            (GeoField::Province, &self.province),
            (GeoField::City, &self.city),
            (GeoField::Municipality, &self.municipality),
        ]
        .into_iter()
        .find_map(|(field, value)| {
            value.as_ref().map(|value| GeoFilter {
                field,
                value: value.clone(),
            })
        })
    }
}

/// Options for a count series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountQuery {
    pub location: Location,
    /// Keep only this many of the most recent dates. `None` keeps all of them.
    pub days: Option<usize>,
    /// Report running totals instead of daily counts.
    pub cumulative: bool,
    /// Only count cases that have neither died nor recovered. Ignored for deaths and
    /// recoveries.
    pub active: bool,
}

impl CountQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.location.region = Some(region.into());
        self
    }

    pub fn province(mut self, province: impl Into<String>) -> Self {
        self.location.province = Some(province.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.location.city = Some(city.into());
        self
    }

    pub fn municipality(mut self, municipality: impl Into<String>) -> Self {
        self.location.municipality = Some(municipality.into());
        self
    }

    pub fn days(mut self, days: impl Into<Option<usize>>) -> Self {
        self.days = days.into();
        self
    }

    pub fn cumulative(mut self, cumulative: bool) -> Self {
        self.cumulative = cumulative;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// One date of a count series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub date: NaiveDate,
    /// The level filtered on, or `None` for all locations.
    pub field: Option<GeoField>,
    /// The place as given in the query, or [`ALL_LOCATIONS`].
    pub label: ArcStr,
    pub count: usize,
}

impl AggregateRow {
    /// Key the place is reported under.
    pub fn label_key(&self) -> &'static str {
        match self.field {
            Some(field) => field.label(),
            None => "Location",
        }
    }
}

impl Serialize for AggregateRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("AggregateRow", 3)?;
        row.serialize_field("Date", &self.date)?;
        row.serialize_field(self.label_key(), &*self.label)?;
        row.serialize_field("Count", &self.count)?;
        row.end()
    }
}

/// Count events per date.
///
/// A place filter must match a place in the case data (ignoring case), otherwise this is an
/// error rather than an empty series.
pub fn count(
    records: &[CaseRecord],
    kind: EventKind,
    query: &CountQuery,
) -> Result<Vec<AggregateRow>, LocationNotFound> {
    let filter = query.location.filter();
    if let Some(filter) = &filter {
        let known = distinct_values(records, filter.field);
        if !known.iter().any(|v| eq_ignore_case(v, &filter.value)) {
            event!(
                Level::WARN,
                "{} {:?} is not found in the case data",
                filter.field,
                filter.value
            );
            return Err(LocationNotFound {
                field: filter.field,
                name: filter.value.clone(),
            });
        }
    }

    let date_field = kind.date_field();
    // Manually insert every date so days with no matching cases are still reported.
    let mut tallies: BTreeMap<NaiveDate, usize> = unique_dates(records, date_field)
        .into_iter()
        .map(|date| (date, 0))
        .collect();
    for case in records {
        let Some(date) = case.date(date_field) else {
            continue
        };
        if !kind.matches(case, query.active) {
            continue;
        }
        if matches!(&filter, Some(filter) if !filter.matches(case)) {
            continue;
        }
        *tallies.entry(date).or_insert(0) += 1;
    }

    let (field, label): (Option<GeoField>, ArcStr) = match filter {
        Some(filter) => (Some(filter.field), filter.value.into()),
        None => (None, ALL_LOCATIONS.into()),
    };
    // B Tree iteration is oldest first, which is the order running totals need.
    let mut total = 0;
    let mut rows: Vec<AggregateRow> = tallies
        .into_iter()
        .map(|(date, tally)| {
            total += tally;
            AggregateRow {
                date,
                field,
                label: label.clone(),
                count: if query.cumulative { total } else { tally },
            }
        })
        .collect();

    let dates = rows.len();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(days) = query.days {
        rows.truncate(days);
    }
    event!(
        Level::DEBUG,
        "counted {} {:?} events over {} dates, reporting {}",
        total,
        kind,
        dates,
        rows.len()
    );
    Ok(rows)
}

#[cfg(test)]
mod test {
    use super::{count, CountQuery, EventKind, Location, ALL_LOCATIONS};
    use crate::{CaseRecord, Cases, GeoField, LocationNotFound};
    use chrono::NaiveDate;
    use std::io;

    const CASES: &str = "\
CaseCode,DateRepConf,DateRepRem,RemovalType,RegionRes,ProvRes,CityMunRes
C1,2020-04-01,,,A,P1,X
C2,2020-04-01,2020-04-03,Recovered,B,P2,Y
C3,2020-04-02,2020-04-03,Died,A,P1,X
C4,2020-04-03,,,A,P3,Z
C5,2020-04-03,2020-04-04,Recovered,A,P1,X
";

    fn cases() -> Cases {
        Cases::from_reader(io::Cursor::new(CASES)).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    fn counts(rows: &[super::AggregateRow]) -> Vec<(NaiveDate, usize)> {
        rows.iter().map(|row| (row.date, row.count)).collect()
    }

    #[test]
    fn daily_newest_first() {
        let rows = count(&cases(), EventKind::Confirmed, &CountQuery::new()).unwrap();
        assert_eq!(counts(&rows), [(date(3), 2), (date(2), 1), (date(1), 2)]);
        assert!(rows.iter().all(|row| &*row.label == ALL_LOCATIONS));
        assert!(rows.iter().all(|row| row.field.is_none()));
    }

    #[test]
    fn cumulative_runs_oldest_first() {
        let rows = count(
            &cases(),
            EventKind::Confirmed,
            &CountQuery::new().cumulative(true),
        )
        .unwrap();
        assert_eq!(counts(&rows), [(date(3), 5), (date(2), 3), (date(1), 2)]);
    }

    #[test]
    fn filtered_keeps_every_date() {
        let rows = count(&cases(), EventKind::Confirmed, &CountQuery::new().region("b")).unwrap();
        assert_eq!(counts(&rows), [(date(3), 0), (date(2), 0), (date(1), 1)]);
        assert_eq!(&*rows[0].label, "b");
        assert_eq!(rows[0].field, Some(GeoField::Region));
    }

    #[test]
    fn window_takes_most_recent() {
        let rows = count(&cases(), EventKind::Confirmed, &CountQuery::new().days(2)).unwrap();
        assert_eq!(counts(&rows), [(date(3), 2), (date(2), 1)]);
        let rows = count(&cases(), EventKind::Confirmed, &CountQuery::new().days(30)).unwrap();
        assert_eq!(rows.len(), 3);
        let rows = count(&cases(), EventKind::Confirmed, &CountQuery::new().days(0)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn removals_use_removal_date() {
        let cases = cases();
        let deaths = count(&cases, EventKind::Died, &CountQuery::new()).unwrap();
        assert_eq!(counts(&deaths), [(date(4), 0), (date(3), 1)]);
        let recovered = count(&cases, EventKind::Recovered, &CountQuery::new()).unwrap();
        assert_eq!(counts(&recovered), [(date(4), 1), (date(3), 1)]);
    }

    #[test]
    fn active_excludes_removed() {
        let rows = count(
            &cases(),
            EventKind::Confirmed,
            &CountQuery::new().active(true),
        )
        .unwrap();
        assert_eq!(counts(&rows), [(date(3), 1), (date(2), 0), (date(1), 1)]);
        // no effect on removals
        let rows = count(&cases(), EventKind::Died, &CountQuery::new().active(true)).unwrap();
        assert_eq!(counts(&rows), [(date(4), 0), (date(3), 1)]);
    }

    #[test]
    fn region_beats_province() {
        let cases = cases();
        let both = count(
            &cases,
            EventKind::Confirmed,
            &CountQuery::new().province("P2").region("A"),
        )
        .unwrap();
        let region = count(&cases, EventKind::Confirmed, &CountQuery::new().region("A")).unwrap();
        assert_eq!(both, region);
    }

    #[test]
    fn precedence_order() {
        let location = Location {
            region: None,
            province: Some("P1".into()),
            city: Some("X".into()),
            municipality: Some("X".into()),
        };
        assert_eq!(location.filter().unwrap().field, GeoField::Province);
        let location = Location {
            municipality: Some("X".into()),
            ..Location::default()
        };
        assert_eq!(location.filter().unwrap().field, GeoField::Municipality);
        assert!(Location::default().filter().is_none());
    }

    #[test]
    fn unknown_location_is_an_error() {
        let err = count(
            &cases(),
            EventKind::Confirmed,
            &CountQuery::new().province("Atlantis"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LocationNotFound {
                field: GeoField::Province,
                name: "Atlantis".into()
            }
        );
    }

    #[test]
    fn empty_data_gives_empty_series() {
        let cases: Cases = std::iter::empty::<CaseRecord>().collect();
        let rows = count(&cases, EventKind::Confirmed, &CountQuery::new()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn serialises_with_place_key() {
        let rows = count(
            &cases(),
            EventKind::Confirmed,
            &CountQuery::new().region("A").cumulative(true),
        )
        .unwrap();
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Date": "2020-04-03", "Region": "A", "Count": 4})
        );
    }
}
