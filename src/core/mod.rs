pub mod etl;
pub mod extractor;
pub mod geocoder;
pub mod lookup;
pub mod persistence;
pub mod pipeline;
pub mod summary;

pub use crate::domain::model::{LatLng, LocationRecord};
pub use crate::domain::ports::{AddressLookup, ConfigProvider, Pipeline, Storage};
pub use crate::domain::report::{RunReport, TransformResult};
pub use crate::utils::error::Result;
