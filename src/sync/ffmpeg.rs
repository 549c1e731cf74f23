//! Local video decoding with FFmpeg.
//!
//! Offsets are relative to the video stream's `start_time`. Seeks land on the
//! closest keyframe at or before the requested offset; the decoder then runs
//! forward until it reaches a frame whose presentation timestamp is not
//! earlier than the offset.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use image::{DynamicImage, RgbImage};

use super::video::{video_error, StreamClock, VideoDecoder};
use crate::error::Result;

pub struct FfmpegVideo {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    clock: StreamClock,
    decoder: ffmpeg::codec::decoder::Video,
    target_pts: Option<i64>,
    frames_read: u64,
}

impl FfmpegVideo {
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().map_err(|e| video_error(path, format!("initialize ffmpeg: {}", e)))?;
        let input = ffmpeg::format::input(&path)
            .map_err(|e| video_error(path, format!("open with ffmpeg: {}", e)))?;
        let (stream_index, clock, parameters) = {
            let stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| video_error(path, "file has no video track"))?;
            let clock = StreamClock::new(stream.start_time(), f64::from(stream.time_base()));
            (stream.index(), clock, stream.parameters())
        };
        let context = ffmpeg::codec::context::Context::from_parameters(parameters)
            .map_err(|e| video_error(path, format!("load decoder parameters: {}", e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| video_error(path, format!("open video decoder: {}", e)))?;
        log::info!(
            "opened {} ({}x{}, stream starts at pts {})",
            path.display(),
            decoder.width(),
            decoder.height(),
            clock.start_pts
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            stream_index,
            clock,
            decoder,
            target_pts: None,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl VideoDecoder for FfmpegVideo {
    fn seek(&mut self, time_ms: i64) -> Result<()> {
        let time_ms = time_ms.max(0);
        let position = self.clock.seek_micros(time_ms);
        self.input
            .seek(position, ..position)
            .map_err(|e| video_error(&self.path, format!("seek to {} ms: {}", time_ms, e)))?;
        self.decoder.flush();
        self.target_pts = self.clock.pts_at(time_ms);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        let target = self.target_pts.take().unwrap_or(i64::MIN);
        let mut decoded = ffmpeg::frame::Video::empty();

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| video_error(&self.path, format!("decode packet: {}", e)))?;
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if decoded.timestamp().is_some_and(|ts| ts < target) {
                    continue;
                }
                self.frames_read += 1;
                return frame_to_image(&self.path, &decoded).map(Some);
            }
        }

        // drain frames still buffered in the decoder
        if self.decoder.send_eof().is_ok() {
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if decoded.timestamp().is_some_and(|ts| ts < target) {
                    continue;
                }
                self.frames_read += 1;
                return frame_to_image(&self.path, &decoded).map(Some);
            }
        }
        Ok(None)
    }
}

fn frame_to_image(path: &Path, frame: &ffmpeg::frame::Video) -> Result<DynamicImage> {
    let mut scaler = ffmpeg::software::scaling::Context::get(
        frame.format(),
        frame.width(),
        frame.height(),
        ffmpeg::util::format::pixel::Pixel::RGB24,
        frame.width(),
        frame.height(),
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )
    .map_err(|e| video_error(path, format!("create scaler: {}", e)))?;
    let mut rgb_frame = ffmpeg::frame::Video::empty();
    scaler
        .run(frame, &mut rgb_frame)
        .map_err(|e| video_error(path, format!("convert frame to RGB: {}", e)))?;

    let width = rgb_frame.width();
    let height = rgb_frame.height();
    let row_bytes = width as usize * 3;
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);

    let pixels = if stride == row_bytes {
        data.get(..row_bytes * height as usize)
            .ok_or_else(|| video_error(path, "frame buffer is truncated"))?
            .to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let line = data
                .get(start..start + row_bytes)
                .ok_or_else(|| video_error(path, "frame row is out of bounds"))?;
            pixels.extend_from_slice(line);
        }
        pixels
    };

    RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| video_error(path, "decoded frame has an unexpected size"))
}
