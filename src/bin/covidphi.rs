use clap::{Args, Parser, Subcommand};
use covidphi::{header, save_csv, CountQuery, Dataset, PatientFields, Sources};
use qu::ick_use::*;
use serde::Serialize;
use std::{fmt, path::PathBuf};

/// Query the DOH COVID-19 case information data drop.
#[derive(Parser)]
struct Opt {
    /// A TOML file listing where the input tables are
    #[clap(long)]
    config: Option<PathBuf>,
    /// The case information table (overrides the config)
    #[clap(long)]
    cases: Option<PathBuf>,
    /// The master geographic code table (overrides the config)
    #[clap(long)]
    geo_codes: Option<PathBuf>,
    /// The address coordinates table (overrides the config)
    #[clap(long)]
    addresses: Option<PathBuf>,
    /// Print results as JSON instead of lines
    #[clap(long)]
    json: bool,
    /// Also save the results to this CSV file
    #[clap(long)]
    save: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Confirmed cases per date
    Cases {
        #[clap(flatten)]
        count: CountOpt,
        /// Only count cases that have not died or recovered
        #[clap(long)]
        active: bool,
    },
    /// Deaths per date
    Deaths {
        #[clap(flatten)]
        count: CountOpt,
    },
    /// Recoveries per date
    Recovered {
        #[clap(flatten)]
        count: CountOpt,
    },
    /// Regions with recorded cases
    Regions,
    /// Provinces with recorded cases
    Provinces {
        /// List provinces with no recorded cases instead
        #[clap(long)]
        without_cases: bool,
    },
    /// Cities with recorded cases
    Cities {
        /// List cities with no recorded cases instead
        #[clap(long)]
        without_cases: bool,
    },
    /// Municipalities with recorded cases
    Municipalities {
        /// List municipalities with no recorded cases instead
        #[clap(long)]
        without_cases: bool,
    },
    /// One line per case
    Patients {
        /// Include the confirmation date, and sort by it
        #[clap(long)]
        date: bool,
        /// Include the city or municipality
        #[clap(long)]
        city_mun: bool,
        /// Include the province
        #[clap(long)]
        province: bool,
        /// Include approximate coordinates
        #[clap(long)]
        coordinates: bool,
    },
}

#[derive(Args)]
struct CountOpt {
    /// Only count cases in this region
    #[clap(long)]
    region: Option<String>,
    /// Only count cases in this province (ignored if a region is given)
    #[clap(long)]
    province: Option<String>,
    /// Only count cases in this city (ignored if a region or province is given)
    #[clap(long)]
    city: Option<String>,
    /// Only count cases in this municipality (ignored if any other place is given)
    #[clap(long)]
    municipality: Option<String>,
    /// Only show this many of the most recent days
    #[clap(long, short)]
    days: Option<usize>,
    /// Show running totals
    #[clap(long, short)]
    cumulative: bool,
}

impl CountOpt {
    fn query(self, active: bool) -> CountQuery {
        let mut query = CountQuery::new()
            .days(self.days)
            .cumulative(self.cumulative)
            .active(active);
        query.location.region = self.region;
        query.location.province = self.province;
        query.location.city = self.city;
        query.location.municipality = self.municipality;
        query
    }
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let mut sources = match &opt.config {
        Some(path) => Sources::load(path)?,
        None => Sources::default(),
    };
    if let Some(cases) = opt.cases {
        sources.cases = cases;
    }
    if opt.geo_codes.is_some() {
        sources.geo_codes = opt.geo_codes;
    }
    if opt.addresses.is_some() {
        sources.addresses = opt.addresses;
    }
    let data = Dataset::open(sources)?;
    let out = Output {
        json: opt.json,
        save: opt.save,
    };

    match opt.command {
        Command::Cases { count, active } => {
            out.title("Confirmed cases");
            out.rows(&data.cases(&count.query(active))?, |row| {
                format!("{}, {}, {}", row.date, row.label, row.count)
            })
        }
        Command::Deaths { count } => {
            out.title("Deaths");
            out.rows(&data.deaths(&count.query(false))?, |row| {
                format!("{}, {}, {}", row.date, row.label, row.count)
            })
        }
        Command::Recovered { count } => {
            out.title("Recoveries");
            out.rows(&data.recovered(&count.query(false))?, |row| {
                format!("{}, {}, {}", row.date, row.label, row.count)
            })
        }
        Command::Regions => out.names("Region", &data.regions()),
        Command::Provinces { without_cases } => {
            out.names("Province", &data.provinces(!without_cases)?)
        }
        Command::Cities { without_cases } => out.names("City", &data.cities(!without_cases)?),
        Command::Municipalities { without_cases } => {
            out.names("Municipality", &data.municipalities(!without_cases)?)
        }
        Command::Patients {
            date,
            city_mun,
            province,
            coordinates,
        } => {
            let fields = PatientFields {
                date,
                city_municipality: city_mun,
                province,
                coordinates,
            };
            out.title("Patients");
            out.rows(&data.patients(fields)?, |row| {
                serde_json::to_string(row).unwrap_or_default()
            })
        }
    }
}

struct Output {
    json: bool,
    save: Option<PathBuf>,
}

#[derive(Serialize)]
struct Named<'a, T> {
    #[serde(rename = "Name")]
    name: &'a T,
}

impl Output {
    fn rows<T: Serialize>(&self, rows: &[T], line: impl Fn(&T) -> String) -> Result {
        if self.json {
            println!("{}", serde_json::to_string_pretty(rows)?);
        } else {
            for row in rows {
                println!("{}", line(row));
            }
        }
        if let Some(path) = &self.save {
            save_csv(rows, path)?;
            event!(Level::INFO, "saved {} rows to \"{}\"", rows.len(), path.display());
        }
        Ok(())
    }

    fn title(&self, title: &str) {
        // keep stdout parseable
        if !self.json {
            header(title);
        }
    }

    fn names<T: Serialize + fmt::Display>(&self, title: &str, names: &[T]) -> Result {
        self.title(title);
        let rows: Vec<Named<T>> = names.iter().map(|name| Named { name }).collect();
        self.rows(&rows, |row| row.name.to_string())
    }
}
