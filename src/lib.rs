pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use crate::core::{
    etl::EtlEngine,
    extractor::{extract, try_extract},
    geocoder::{Geocoder, RetryPolicy},
    lookup::{lookup_from_config, GoogleLookup, NominatimLookup},
    pipeline::LocatorPipeline,
};
pub use domain::model::{InputFormat, LatLng, LocationRecord, Operation, Provider};
pub use domain::ports::{AddressLookup, ConfigProvider, Pipeline, Storage};
pub use domain::report::{GeocodeReport, GeocodeStatus, RunReport};
pub use utils::error::{EtlError, Result};
