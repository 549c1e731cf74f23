//! Frame persistence pipeline.
//!
//! One producer thread drains the synchronizer and numbers the frames; one
//! consumer thread transforms and writes them in the order received. The two
//! are joined by a bounded queue and the producer finishes the stream with an
//! explicit end marker.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::TransformOptions;
use crate::error::{FrameSyncError, Result};
use crate::transform;
use crate::types::Frame;

/// Decoded frames waiting for the consumer. The producer blocks when full.
const FRAME_QUEUE_CAPACITY: usize = 16;

enum WorkItem {
    Frame { index: usize, frame: Frame },
    Done,
}

/// Output image path for the frame at `index` in emission order.
pub fn frame_filename(destination: &Path, index: usize) -> PathBuf {
    destination.join(format!("{:07}.jpg", index))
}

/// Persists every frame of `frames` under `destination` and writes one record
/// per frame to `csv_sink`. Returns the number of persisted frames.
///
/// `csv_sink` must not emit its own header; open it with
/// [`synced_frame_writer`](crate::io::synced_frame_writer).
///
/// Any synchronizer error or persistence failure stops the run.
pub fn run<I, W>(
    frames: I,
    destination: &Path,
    csv_sink: &mut csv::Writer<W>,
    options: &TransformOptions,
) -> Result<usize>
where
    I: IntoIterator<Item = Result<Frame>>,
    I::IntoIter: Send,
    W: Write + Send,
{
    options.validate()?;
    std::fs::create_dir_all(destination).map_err(|e| FrameSyncError::io(destination, e))?;

    let (sender, receiver) = bounded::<WorkItem>(FRAME_QUEUE_CAPACITY);
    let frames = frames.into_iter();

    thread::scope(|scope| {
        let producer = scope.spawn(move || produce(frames, sender));
        let consumer = scope.spawn(move || consume(receiver, destination, csv_sink, options));

        let consumed = consumer
            .join()
            .map_err(|_| FrameSyncError::Worker("frame consumer panicked".to_string()))?;
        let produced = producer
            .join()
            .map_err(|_| FrameSyncError::Worker("frame producer panicked".to_string()))?;

        let persisted = consumed?;
        let emitted = produced?;
        log::info!("{} frames emitted, {} persisted", emitted, persisted);
        Ok(persisted)
    })
}

fn produce<I>(frames: I, sender: Sender<WorkItem>) -> Result<usize>
where
    I: Iterator<Item = Result<Frame>>,
{
    let mut index = 0;
    for frame in frames {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                let _ = sender.send(WorkItem::Done);
                return Err(e);
            }
        };
        if frame.array.is_none() {
            log::warn!(
                "dropping frame at {} ms of {} without image data",
                frame.time_ms,
                frame.video_filename
            );
            continue;
        }
        if sender.send(WorkItem::Frame { index, frame }).is_err() {
            log::debug!("consumer stopped after {} frames", index);
            return Ok(index);
        }
        index += 1;
    }
    let _ = sender.send(WorkItem::Done);
    Ok(index)
}

fn consume<W: Write>(
    receiver: Receiver<WorkItem>,
    destination: &Path,
    sink: &mut csv::Writer<W>,
    options: &TransformOptions,
) -> Result<usize> {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} frames persisted {msg}") {
        progress.set_style(style);
    }

    let mut persisted = 0;
    loop {
        match receiver.recv() {
            Ok(WorkItem::Frame { index, frame }) => {
                persist(index, frame, destination, sink, options)?;
                persisted += 1;
                progress.inc(1);
            }
            Ok(WorkItem::Done) => break,
            Err(_) => {
                log::warn!("frame producer exited without end marker");
                break;
            }
        }
    }
    sink.flush()
        .map_err(|e| FrameSyncError::Worker(format!("flush synced-frame table: {}", e)))?;
    progress.finish();
    Ok(persisted)
}

fn persist<W: Write>(
    index: usize,
    mut frame: Frame,
    destination: &Path,
    sink: &mut csv::Writer<W>,
    options: &TransformOptions,
) -> Result<()> {
    let path = frame_filename(destination, index);
    let filename = path.to_string_lossy().into_owned();
    let fail = |message: String| FrameSyncError::Persist {
        index,
        filename: filename.clone(),
        message,
    };

    let image = frame
        .array
        .take()
        .ok_or_else(|| fail("frame has no image data".to_string()))?;
    let mut image = transform::apply(image, options).map_err(fail)?;
    if image.color().has_alpha() {
        image = DynamicImage::ImageRgb8(image.to_rgb8());
    }
    image.save(&path).map_err(|e| fail(e.to_string()))?;
    sink.serialize(frame.to_record(filename.clone()))
        .map_err(|e| fail(e.to_string()))?;
    log::trace!("persisted {}", filename);
    Ok(())
}
