//! Reference tables about places: the master list of administrative units, and approximate
//! coordinates for addresses.
use crate::{
    table::{self, Column},
    util::{opt_f64, optional_string},
    ArcStr, CaseRecord, DataError, Result,
};
use anyhow::Context;
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, io, ops::Deref, path::Path, sync::Arc};

const GEO_CODE_COLUMNS: &[Column] = &[
    Column {
        name: "geographic level",
        accepted: &["Geographic Level", "GeographicLevel", "Inter-Level"],
    },
    Column {
        name: "name",
        accepted: &["Name"],
    },
];

const ADDRESS_COLUMNS: &[Column] = &[
    Column {
        name: "latitude",
        accepted: &["Latitude", "Lat"],
    },
    Column {
        name: "longitude",
        accepted: &["Longitude", "Lng", "Lon"],
    },
];

/// Either of these is enough to build the address key.
const ADDRESS_KEY_COLUMNS: &[Column] = &[Column {
    name: "address",
    accepted: &["Address", "CityMunProv"],
}];
const ADDRESS_PART_COLUMNS: &[Column] = &[
    Column {
        name: "city/municipality",
        accepted: &["CityMun", "CityMunRes"],
    },
    Column {
        name: "province",
        accepted: &["Province", "ProvRes"],
    },
];

/// The levels of the master code list that can be checked against the case data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeoLevel {
    #[serde(rename = "Prov")]
    Province,
    #[serde(rename = "City")]
    City,
    #[serde(rename = "Mun")]
    Municipality,
}

impl GeoLevel {
    /// Parse the code used in the geographic level column. Other levels (regions, barangays,
    /// sub-municipalities) give `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Prov" => Some(GeoLevel::Province),
            "City" => Some(GeoLevel::City),
            "Mun" => Some(GeoLevel::Municipality),
            _ => None,
        }
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeoLevel::Province => f.write_str("Prov"),
            GeoLevel::City => f.write_str("City"),
            GeoLevel::Municipality => f.write_str("Mun"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoCodeRaw {
    #[serde(
        rename = "Geographic Level",
        alias = "GeographicLevel",
        alias = "Inter-Level",
        deserialize_with = "optional_string"
    )]
    level: Option<ArcStr>,
    #[serde(rename = "Name")]
    name: ArcStr,
}

/// A row in the master administrative code list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoCodeRecord {
    pub level: GeoLevel,
    /// As written in the list, usually upper case.
    pub name: ArcStr,
}

impl GeoCodeRecord {
    fn from_raw(raw: GeoCodeRaw) -> Option<Self> {
        let level = GeoLevel::from_code(raw.level.as_deref()?)?;
        Some(GeoCodeRecord {
            level,
            name: raw.name,
        })
    }
}

/// The master administrative code list, keeping only provinces, cities and municipalities.
#[derive(Debug, Clone)]
pub struct GeoCodes {
    els: Arc<Vec<GeoCodeRecord>>,
}

impl GeoCodes {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw: Vec<GeoCodeRaw> = table::load_rows(path, GEO_CODE_COLUMNS)?;
        let codes = Self::from_raw(raw);
        event!(
            Level::INFO,
            "loaded {} geographic codes from \"{}\"",
            codes.len(),
            path.display()
        );
        Ok(codes)
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self, DataError> {
        Ok(Self::from_raw(table::read_rows(
            reader,
            GEO_CODE_COLUMNS,
            None,
        )?))
    }

    fn from_raw(raw: Vec<GeoCodeRaw>) -> Self {
        GeoCodes {
            els: Arc::new(raw.into_iter().filter_map(GeoCodeRecord::from_raw).collect()),
        }
    }

    /// Units at the given level.
    pub fn at_level(&self, level: GeoLevel) -> impl Iterator<Item = &GeoCodeRecord> + '_ {
        self.els.iter().filter(move |el| el.level == level)
    }
}

impl Deref for GeoCodes {
    type Target = [GeoCodeRecord];
    fn deref(&self) -> &Self::Target {
        &*self.els
    }
}

impl FromIterator<GeoCodeRecord> for GeoCodes {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = GeoCodeRecord>,
    {
        GeoCodes {
            els: Arc::new(iter.into_iter().collect()),
        }
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct AddressRaw {
    #[serde(
        default,
        rename = "Address",
        alias = "CityMunProv",
        deserialize_with = "optional_string"
    )]
    address: Option<ArcStr>,
    #[serde(
        default,
        rename = "CityMun",
        alias = "CityMunRes",
        deserialize_with = "optional_string"
    )]
    city_municipality: Option<ArcStr>,
    #[serde(
        default,
        rename = "Province",
        alias = "ProvRes",
        deserialize_with = "optional_string"
    )]
    province: Option<ArcStr>,
    #[serde(rename = "Latitude", alias = "Lat", deserialize_with = "opt_f64")]
    latitude: Option<f64>,
    #[serde(
        rename = "Longitude",
        alias = "Lng",
        alias = "Lon",
        deserialize_with = "opt_f64"
    )]
    longitude: Option<f64>,
}

impl AddressRaw {
    fn key(&self) -> Option<String> {
        if let Some(address) = &self.address {
            return Some(address.to_string());
        }
        Some(address_key(
            self.city_municipality.as_deref()?,
            self.province.as_deref()?,
        ))
    }
}

/// The lookup key for a place: `"City/Municipality, Province"`.
pub fn address_key(city_municipality: &str, province: &str) -> String {
    format!("{}, {}", city_municipality, province)
}

/// The key a case is looked up with, if it has enough of an address.
pub fn case_address_key(case: &CaseRecord) -> Option<String> {
    Some(address_key(case.city_municipality()?, case.province.as_deref()?))
}

/// Approximate coordinates for addresses.
///
/// Keys match exactly, including case. When a key appears twice, the first row wins.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    by_key: Arc<HashMap<String, Coordinates>>,
}

impl AddressBook {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<AddressBook, DataError> {
            let file = std::fs::File::open(path).map_err(|source| DataError::Io {
                path: path.into(),
                source,
            })?;
            AddressBook::read(io::BufReader::new(file), Some(path))
        }
        let path = path.as_ref();
        let book =
            inner(path).with_context(|| format!("while loading \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "loaded {} addresses from \"{}\"",
            book.len(),
            path.display()
        );
        Ok(book)
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self, DataError> {
        Self::read(reader, None)
    }

    fn read(reader: impl io::Read, path: Option<&Path>) -> Result<Self, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().map_err(|e| DataError::from_csv(path, e))?;
        table::check_columns(headers, ADDRESS_COLUMNS)?;
        // no single key column means we need both halves of the composite key
        if table::check_columns(headers, ADDRESS_KEY_COLUMNS).is_err() {
            table::check_columns(headers, ADDRESS_PART_COLUMNS)?;
        }

        let mut by_key = HashMap::new();
        for row in rdr.into_deserialize() {
            let row: AddressRaw = row.map_err(|e| DataError::from_csv(path, e))?;
            let (Some(key), Some(latitude), Some(longitude)) =
                (row.key(), row.latitude, row.longitude)
            else {
                continue;
            };
            by_key.entry(key).or_insert(Coordinates {
                latitude,
                longitude,
            });
        }
        Ok(AddressBook {
            by_key: Arc::new(by_key),
        })
    }

    pub fn get(&self, key: &str) -> Option<Coordinates> {
        self.by_key.get(key).copied()
    }

    /// Coordinates for a case, if its address is known.
    pub fn locate(&self, case: &CaseRecord) -> Option<Coordinates> {
        self.get(&case_address_key(case)?)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl FromIterator<(String, Coordinates)> for AddressBook {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (String, Coordinates)>,
    {
        let mut by_key = HashMap::new();
        for (key, coords) in iter {
            by_key.entry(key).or_insert(coords);
        }
        AddressBook {
            by_key: Arc::new(by_key),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{AddressBook, Coordinates, GeoCodes, GeoLevel};
    use crate::DataError;
    use std::io;

    #[test]
    fn geo_codes_keep_known_levels() {
        let input = "\
Code,Name,Geographic Level
010000000,REGION I (ILOCOS REGION),Reg
012800000,ILOCOS NORTE,Prov
012805000,CITY OF BATAC,City
012801000,ADAMS,Mun
012801001,Adams (Pob.),Bgy
";
        let codes = GeoCodes::from_reader(io::Cursor::new(input)).unwrap();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes.at_level(GeoLevel::Province).count(), 1);
        assert_eq!(
            &*codes.at_level(GeoLevel::City).next().unwrap().name,
            "CITY OF BATAC"
        );
    }

    #[test]
    fn address_book_composite_columns() {
        let input = "\
CityMun,Province,Latitude,Longitude
Malolos,Bulacan,14.8527,120.8160
Malolos,Bulacan,0,0
Quezon City,,14.6760,121.0437
Unknown,Nowhere,,
";
        let book = AddressBook::from_reader(io::Cursor::new(input)).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(
            book.get("Malolos, Bulacan"),
            Some(Coordinates {
                latitude: 14.8527,
                longitude: 120.8160
            })
        );
        assert_eq!(book.get("malolos, bulacan"), None);
    }

    #[test]
    fn address_book_key_column() {
        let input = "Address,Lat,Lng\n\"Malolos, Bulacan\",14.85,120.81\n";
        let book = AddressBook::from_reader(io::Cursor::new(input)).unwrap();
        assert!(book.get("Malolos, Bulacan").is_some());
    }

    #[test]
    fn address_book_needs_a_key() {
        let input = "Province,Latitude,Longitude\nBulacan,14.85,120.81\n";
        let err = AddressBook::from_reader(io::Cursor::new(input)).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn {
                column: "city/municipality",
                ..
            }
        ));
    }

    #[test]
    fn bad_coordinate_is_format_error() {
        let input = "Address,Latitude,Longitude\nSomewhere,north,120.81\n";
        let err = AddressBook::from_reader(io::Cursor::new(input)).unwrap_err();
        assert!(matches!(err, DataError::Format { row: 1, .. }));
    }
}
