use std::path::Path;

use super::{read_log, LogFormat, TelemetryRow};
use crate::error::{FrameSyncError, Result};

/// Contiguous run of in-video telemetry belonging to one video file.
///
/// `time_ms` of the first row is zero; later rows keep their original spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSegment {
    pub rows: Vec<TelemetryRow>,
}

impl VideoSegment {
    fn rebased(mut rows: Vec<TelemetryRow>) -> VideoSegment {
        if let Some(origin) = rows.first().map(|r| r.time_ms) {
            let mut previous = 0;
            for row in rows.iter_mut() {
                row.time_ms -= origin;
                if row.time_ms < previous {
                    log::warn!(
                        "telemetry time goes backwards inside a video segment ({} ms < {} ms)",
                        row.time_ms,
                        previous
                    );
                }
                previous = row.time_ms;
            }
        }
        VideoSegment { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Number of 0 -> 1 transitions of the video flag. The state before the first
/// row counts as "not filming".
pub fn count_rising_edges<'a>(rows: impl IntoIterator<Item = &'a TelemetryRow>) -> usize {
    let mut in_video = false;
    let mut edges = 0;
    for row in rows {
        if row.is_video && !in_video {
            edges += 1;
        }
        in_video = row.is_video;
    }
    edges
}

/// Reads the logs in order and splits them into one segment per video file.
pub fn align<P: AsRef<Path>>(
    log_paths: &[P],
    format: LogFormat,
    video_count: usize,
) -> Result<Vec<VideoSegment>> {
    let logs = log_paths
        .iter()
        .map(|p| read_log(p.as_ref(), format))
        .collect::<Result<Vec<_>>>()?;
    align_logs(logs, video_count)
}

/// Splits already-parsed logs into per-video segments.
///
/// Logs without any flagged row are treated as pre-split: each log is one
/// segment and every row is kept.
pub fn align_logs(logs: Vec<Vec<TelemetryRow>>, video_count: usize) -> Result<Vec<VideoSegment>> {
    let edges = count_rising_edges(logs.iter().flatten());

    if edges == 0 {
        if logs.len() != video_count {
            log::warn!(
                "{} pre-split flight logs for {} videos; extra entries are ignored",
                logs.len(),
                video_count
            );
        }
        let segments: Vec<_> = logs
            .into_iter()
            .filter(|rows| !rows.is_empty())
            .map(VideoSegment::rebased)
            .collect();
        log::info!("no video flag transitions, using {} logs as segments", segments.len());
        return Ok(segments);
    }

    if edges != video_count {
        return Err(FrameSyncError::AlignmentMismatch {
            segments: edges,
            videos: video_count,
        });
    }

    let mut runs: Vec<Vec<TelemetryRow>> = Vec::with_capacity(edges);
    let mut in_video = false;
    for row in logs.into_iter().flatten() {
        let flagged = row.is_video;
        if flagged && !in_video {
            runs.push(Vec::new());
        }
        if flagged {
            if let Some(run) = runs.last_mut() {
                run.push(row);
            }
        }
        in_video = flagged;
    }

    let segments: Vec<_> = runs
        .into_iter()
        .filter(|run| !run.is_empty())
        .map(VideoSegment::rebased)
        .collect();
    for (i, segment) in segments.iter().enumerate() {
        log::debug!("segment {}: {} rows", i, segment.len());
    }
    Ok(segments)
}
