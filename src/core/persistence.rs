use crate::domain::model::LocationRecord;
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};

/// Reads a file, reporting a missing file as [`EtlError::InputNotFound`].
pub async fn read_input<S: Storage>(storage: &S, path: &str) -> Result<Vec<u8>> {
    storage.read_file(path).await.map_err(|e| match e {
        EtlError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            EtlError::InputNotFound {
                path: path.to_string(),
            }
        }
        other => other,
    })
}

pub fn records_to_json(records: &[LocationRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn records_from_json(data: &[u8]) -> Result<Vec<LocationRecord>> {
    Ok(serde_json::from_slice(data)?)
}

pub async fn save_records<S: Storage>(
    storage: &S,
    path: &str,
    records: &[LocationRecord],
) -> Result<()> {
    let json = records_to_json(records)?;
    tracing::debug!("Writing {} records ({} bytes) to {}", records.len(), json.len(), path);
    storage.write_file(path, json.as_bytes()).await?;
    tracing::info!("Results saved to {}", path);
    Ok(())
}

pub async fn load_records<S: Storage>(storage: &S, path: &str) -> Result<Vec<LocationRecord>> {
    let data = read_input(storage, path).await?;
    let records = records_from_json(&data)?;
    tracing::info!("Loaded {} locations from {}", records.len(), path);
    Ok(records)
}
