use crate::{
    aggregate::{self, AggregateRow, CountQuery, EventKind},
    dimension, patient, AddressBook, ArcStr, Cases, GeoCodes, GeoField, GeoLevel,
    LocationNotFound, PatientFields, PatientRecord, Result, Sources,
};
use once_cell::sync::OnceCell;

/// The case data together with the reference tables it is reported against.
///
/// The reference tables are read the first time they are needed, then kept. All data is
/// read-only once loaded, so a `Dataset` can be shared between threads.
#[derive(Debug)]
pub struct Dataset {
    cases: Cases,
    sources: Sources,
    geo_codes: OnceCell<GeoCodes>,
    addresses: OnceCell<AddressBook>,
}

impl Dataset {
    /// Load the case table. Reference tables are loaded later, when needed.
    pub fn open(sources: Sources) -> Result<Self> {
        let cases = Cases::load(&sources.cases)?;
        Ok(Self::new(cases, sources))
    }

    /// Use already loaded cases. `sources.cases` is ignored.
    pub fn new(cases: Cases, sources: Sources) -> Self {
        Dataset {
            cases,
            sources,
            geo_codes: OnceCell::new(),
            addresses: OnceCell::new(),
        }
    }

    /// Provide the reference tables directly rather than from files.
    pub fn with_reference(
        cases: Cases,
        geo_codes: Option<GeoCodes>,
        addresses: Option<AddressBook>,
    ) -> Self {
        let mut this = Self::new(
            cases,
            Sources {
                geo_codes: None,
                addresses: None,
                ..Sources::default()
            },
        );
        if let Some(geo_codes) = geo_codes {
            this.geo_codes = OnceCell::with_value(geo_codes);
        }
        if let Some(addresses) = addresses {
            this.addresses = OnceCell::with_value(addresses);
        }
        this
    }

    pub fn cases_table(&self) -> &Cases {
        &self.cases
    }

    pub fn geo_codes(&self) -> Result<&GeoCodes> {
        self.geo_codes
            .get_or_try_init(|| GeoCodes::load(self.sources.geo_codes()?))
    }

    pub fn addresses(&self) -> Result<&AddressBook> {
        self.addresses
            .get_or_try_init(|| AddressBook::load(self.sources.addresses()?))
    }

    /// Confirmed cases per date.
    pub fn cases(&self, query: &CountQuery) -> Result<Vec<AggregateRow>, LocationNotFound> {
        aggregate::count(&self.cases, EventKind::Confirmed, query)
    }

    /// Deaths per date of removal.
    pub fn deaths(&self, query: &CountQuery) -> Result<Vec<AggregateRow>, LocationNotFound> {
        aggregate::count(&self.cases, EventKind::Died, query)
    }

    /// Recoveries per date of removal.
    pub fn recovered(&self, query: &CountQuery) -> Result<Vec<AggregateRow>, LocationNotFound> {
        aggregate::count(&self.cases, EventKind::Recovered, query)
    }

    /// Regions with at least one case.
    pub fn regions(&self) -> Vec<ArcStr> {
        dimension::distinct_values(&self.cases, GeoField::Region)
    }

    /// Provinces with cases, or with `covid == false`, provinces in the code list without any.
    pub fn provinces(&self, covid: bool) -> Result<Vec<String>> {
        self.places(covid, GeoLevel::Province, GeoField::Province)
    }

    /// Cities with cases, or with `covid == false`, cities in the code list without any.
    pub fn cities(&self, covid: bool) -> Result<Vec<String>> {
        self.places(covid, GeoLevel::City, GeoField::City)
    }

    /// Municipalities with cases, or with `covid == false`, municipalities in the code list
    /// without any.
    pub fn municipalities(&self, covid: bool) -> Result<Vec<String>> {
        self.places(covid, GeoLevel::Municipality, GeoField::Municipality)
    }

    fn places(&self, covid: bool, level: GeoLevel, field: GeoField) -> Result<Vec<String>> {
        if covid {
            return Ok(dimension::distinct_values(&self.cases, field)
                .iter()
                .map(|v| v.to_string())
                .collect());
        }
        Ok(dimension::absent_units(
            &self.cases,
            self.geo_codes()?,
            level,
            field,
        ))
    }

    /// One record per case. The address table is only loaded if coordinates are asked for.
    pub fn patients(&self, fields: PatientFields) -> Result<Vec<PatientRecord>> {
        let addresses = if fields.coordinates {
            Some(self.addresses()?)
        } else {
            None
        };
        Ok(patient::project(&self.cases, fields, addresses))
    }
}
