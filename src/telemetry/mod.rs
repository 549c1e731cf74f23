//! Flight-log parsing.
//!
//! Logs are CSV exports from airdata.com. Each row is one sample of the
//! aircraft state; `isVideo` marks samples recorded while the camera was
//! filming.

pub mod align;

pub use align::{align, align_logs, count_rising_edges, VideoSegment};

use std::path::Path;

use csv::StringRecord;

use crate::error::{FrameSyncError, Result};

const FEET_TO_METERS: f64 = 0.3048;

const TIME_COLUMN: &str = "time(millisecond)";
const DATETIME_COLUMN: &str = "datetime(utc)";
const LATITUDE_COLUMN: &str = "latitude";
const LONGITUDE_COLUMN: &str = "longitude";
const PITCH_COLUMN: &str = "gimbal_pitch(degrees)";
const ROLL_COLUMN: &str = "gimbal_roll(degrees)";
const YAW_COLUMN: &str = "gimbal_heading(degrees)";
const VIDEO_FLAG_COLUMN: &str = "isVideo";

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRow {
    pub is_video: bool,
    /// milliseconds; rebased to the start of the recording after alignment
    pub time_ms: i64,
    pub datetime_utc: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ground_level_altitude_m: f64,
    pub sea_level_altitude_m: f64,
    pub gimbal_pitch_deg: f64,
    pub gimbal_roll_deg: f64,
    pub gimbal_yaw_deg: f64,
}

/// Column naming and altitude units of a flight log export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    AirdataFeet,
    AirdataMeters,
}

impl LogFormat {
    fn unit(self) -> &'static str {
        match self {
            LogFormat::AirdataFeet => "feet",
            LogFormat::AirdataMeters => "meters",
        }
    }

    /// Factor converting the log's altitude unit to meters.
    pub fn altitude_scale(self) -> f64 {
        match self {
            LogFormat::AirdataFeet => FEET_TO_METERS,
            LogFormat::AirdataMeters => 1.0,
        }
    }

    pub fn ground_altitude_column(self) -> String {
        format!("height_above_takeoff({})", self.unit())
    }

    pub fn sea_level_altitude_column(self) -> String {
        format!("altitude_above_seaLevel({})", self.unit())
    }
}

struct ColumnIndex {
    time: usize,
    datetime: usize,
    latitude: usize,
    longitude: usize,
    ground_altitude: usize,
    sea_level_altitude: usize,
    pitch: usize,
    roll: usize,
    yaw: usize,
    video_flag: Option<usize>,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord, format: LogFormat, path: &Path) -> Result<ColumnIndex> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| FrameSyncError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
        };
        let video_flag = find(VIDEO_FLAG_COLUMN);
        if video_flag.is_none() {
            log::debug!("{}: no {} column", path.display(), VIDEO_FLAG_COLUMN);
        }
        Ok(ColumnIndex {
            time: require(TIME_COLUMN)?,
            datetime: require(DATETIME_COLUMN)?,
            latitude: require(LATITUDE_COLUMN)?,
            longitude: require(LONGITUDE_COLUMN)?,
            ground_altitude: require(&format.ground_altitude_column())?,
            sea_level_altitude: require(&format.sea_level_altitude_column())?,
            pitch: require(PITCH_COLUMN)?,
            roll: require(ROLL_COLUMN)?,
            yaw: require(YAW_COLUMN)?,
            video_flag,
        })
    }
}

struct RowParser<'a> {
    record: &'a StringRecord,
    path: &'a Path,
    line: u64,
}

impl RowParser<'_> {
    fn text(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("")
    }

    fn error(&self, message: String) -> FrameSyncError {
        FrameSyncError::Telemetry {
            path: self.path.to_path_buf(),
            line: self.line,
            message,
        }
    }

    fn number(&self, idx: usize) -> Result<f64> {
        let value = self.text(idx);
        value
            .parse::<f64>()
            .map_err(|_| self.error(format!("'{}' is not a number", value)))
    }

    fn flag(&self, idx: Option<usize>) -> Result<bool> {
        let Some(idx) = idx else {
            return Ok(false);
        };
        match self.text(idx) {
            "" => Ok(false),
            "true" | "True" | "TRUE" => Ok(true),
            "false" | "False" | "FALSE" => Ok(false),
            other => other
                .parse::<f64>()
                .map(|v| v != 0.0)
                .map_err(|_| self.error(format!("'{}' is not a video flag", other))),
        }
    }
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnIndex,
    format: LogFormat,
    path: &Path,
    line: u64,
) -> Result<TelemetryRow> {
    let p = RowParser { record, path, line };
    let scale = format.altitude_scale();
    Ok(TelemetryRow {
        is_video: p.flag(columns.video_flag)?,
        time_ms: p.number(columns.time)?.round() as i64,
        datetime_utc: p.text(columns.datetime).to_string(),
        latitude: p.number(columns.latitude)?,
        longitude: p.number(columns.longitude)?,
        ground_level_altitude_m: p.number(columns.ground_altitude)? * scale,
        sea_level_altitude_m: p.number(columns.sea_level_altitude)? * scale,
        gimbal_pitch_deg: p.number(columns.pitch)?,
        gimbal_roll_deg: p.number(columns.roll)?,
        gimbal_yaw_deg: p.number(columns.yaw)?,
    })
}

/// Reads every row of one flight log, converting altitudes to meters.
pub fn read_log(path: &Path, format: LogFormat) -> Result<Vec<TelemetryRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| FrameSyncError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| FrameSyncError::csv(path, e))?
        .clone();
    let columns = ColumnIndex::locate(&headers, format, path)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| FrameSyncError::csv(path, e))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(i as u64 + 2);
        rows.push(parse_row(&record, &columns, format, path, line)?);
    }
    log::debug!("{}: {} telemetry rows", path.display(), rows.len());
    Ok(rows)
}
