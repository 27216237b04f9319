use crate::{DataError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Where the input tables live.
///
/// Every key is optional in the TOML file; missing keys take the defaults below.
///
/// ```toml
/// cases = "data/DOH COVID Data Drop Case Information.csv"
/// geo_codes = "data/PSGC.csv"
/// addresses = "data/addresses.csv"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    /// The case information table.
    pub cases: PathBuf,
    /// The master list of administrative units, for finding places without cases.
    pub geo_codes: Option<PathBuf>,
    /// Coordinates by `"City/Municipality, Province"`.
    pub addresses: Option<PathBuf>,
}

impl Default for Sources {
    fn default() -> Self {
        Sources {
            cases: "data/DOH COVID Data Drop Case Information.csv".into(),
            geo_codes: Some("data/PSGC.csv".into()),
            addresses: Some("data/addresses.csv".into()),
        }
    }
}

impl Sources {
    /// Only the case table, with no reference tables.
    pub fn cases_only(cases: impl Into<PathBuf>) -> Self {
        Sources {
            cases: cases.into(),
            geo_codes: None,
            addresses: None,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Sources> {
            let text = fs::read_to_string(path).map_err(|source| DataError::Io {
                path: path.into(),
                source,
            })?;
            Ok(toml::from_str(&text)?)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading sources from \"{}\"", path.display()))
    }

    pub(crate) fn geo_codes(&self) -> Result<&Path, DataError> {
        self.geo_codes
            .as_deref()
            .ok_or(DataError::NoSource("geographic code"))
    }

    pub(crate) fn addresses(&self) -> Result<&Path, DataError> {
        self.addresses
            .as_deref()
            .ok_or(DataError::NoSource("address"))
    }
}
