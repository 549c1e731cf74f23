use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{FrameSyncError, Result};
use crate::types::SyncedFrameRecord;

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(file_path).map_err(|e| FrameSyncError::io(file_path, e))?;
    serde_json::from_str(&contents).map_err(|source| FrameSyncError::Json {
        path: file_path.to_path_buf(),
        source,
    })
}

/// Column order of the synced-frame table.
pub const SYNCED_FRAME_COLUMNS: [&str; 11] = [
    "filename",
    "video_filename",
    "time",
    "datetime",
    "latitude",
    "longitude",
    "ground_level_altitude",
    "sea_level_altitude",
    "gimbal_pitch",
    "gimbal_roll",
    "gimbal_yaw",
];

/// Opens a CSV writer for synced-frame records with the header row already
/// written, so a table without records still names its columns.
pub fn synced_frame_writer(output_path: &Path) -> Result<csv::Writer<File>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)
        .map_err(|e| FrameSyncError::csv(output_path, e))?;
    writer
        .write_record(SYNCED_FRAME_COLUMNS)
        .map_err(|e| FrameSyncError::csv(output_path, e))?;
    Ok(writer)
}

pub fn write_synced_frames<W: Write>(
    writer: &mut csv::Writer<W>,
    records: &[SyncedFrameRecord],
) -> csv::Result<()> {
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_synced_frames(csv_path: &Path) -> Result<Vec<SyncedFrameRecord>> {
    let mut reader =
        csv::Reader::from_path(csv_path).map_err(|e| FrameSyncError::csv(csv_path, e))?;
    reader
        .deserialize()
        .collect::<csv::Result<Vec<SyncedFrameRecord>>>()
        .map_err(|e| FrameSyncError::csv(csv_path, e))
}
