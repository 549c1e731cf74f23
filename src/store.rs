//! Bulk array store built from a synced-frame table.
//!
//! Every listed image is re-read, optionally reduced to one channel and
//! resized, and stored under its filename with the remaining columns as
//! attributes.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use indicatif::ProgressIterator;

use crate::config::TransformOptions;
use crate::error::{FrameSyncError, Result};
use crate::io::read_synced_frames;
use crate::transform;
use crate::types::SyncedFrameRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

pub trait ArrayStore {
    fn put(
        &mut self,
        name: &str,
        image: &DynamicImage,
        attributes: &[(&'static str, AttributeValue)],
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// 1 stores grayscale arrays
    pub channels: Option<u8>,
    /// (width, height)
    pub shape: Option<(u32, u32)>,
}

impl StoreOptions {
    fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            crop: None,
            channels: self.channels.unwrap_or(3),
            size: self.shape,
        }
    }
}

pub fn ensure_absent(store_path: &Path) -> Result<()> {
    if store_path.exists() {
        return Err(FrameSyncError::StoreCollision(store_path.to_path_buf()));
    }
    Ok(())
}

/// Every column of the record except `filename`, in table order.
pub fn record_attributes(record: &SyncedFrameRecord) -> Vec<(&'static str, AttributeValue)> {
    use AttributeValue::*;
    vec![
        ("video_filename", Text(record.video_filename.clone())),
        ("time", Integer(record.time)),
        ("datetime", Text(record.datetime.clone())),
        ("latitude", Float(record.latitude)),
        ("longitude", Float(record.longitude)),
        ("ground_level_altitude", Float(record.ground_level_altitude)),
        ("sea_level_altitude", Float(record.sea_level_altitude)),
        ("gimbal_pitch", Float(record.gimbal_pitch)),
        ("gimbal_roll", Float(record.gimbal_roll)),
        ("gimbal_yaw", Float(record.gimbal_yaw)),
    ]
}

/// Writes one entry per record into `store`. Returns the number of entries.
pub fn fill_store<S: ArrayStore>(
    records: &[SyncedFrameRecord],
    store: &mut S,
    options: &StoreOptions,
) -> Result<usize> {
    let transform_options = options.transform_options();
    transform_options.validate()?;

    for record in records.iter().progress_count(records.len() as u64) {
        let path = PathBuf::from(&record.filename);
        let image = image::open(&path).map_err(|e| FrameSyncError::image(&path, e))?;
        let image = transform::apply(image, &transform_options).map_err(|message| {
            FrameSyncError::Store {
                path: path.clone(),
                message,
            }
        })?;
        store.put(&record.filename, &image, &record_attributes(record))?;
    }
    Ok(records.len())
}

/// Builds an HDF5 store at `store_path` from the table at `csv_path`. Fails
/// before writing anything if `store_path` exists.
pub fn build_store(csv_path: &Path, store_path: &Path, options: &StoreOptions) -> Result<usize> {
    ensure_absent(store_path)?;
    let records = read_synced_frames(csv_path)?;

    #[cfg(feature = "store-hdf5")]
    {
        let mut store = hdf5_store::Hdf5Store::create(store_path)?;
        let count = fill_store(&records, &mut store, options)?;
        log::info!("stored {} frames in {}", count, store_path.display());
        Ok(count)
    }
    #[cfg(not(feature = "store-hdf5"))]
    {
        let _ = (records, options);
        Err(FrameSyncError::Store {
            path: store_path.to_path_buf(),
            message: "bulk store requires the store-hdf5 feature".to_string(),
        })
    }
}

#[cfg(feature = "store-hdf5")]
pub mod hdf5_store {
    use std::path::{Component, Path, PathBuf};

    use hdf5::types::VarLenUnicode;
    use image::DynamicImage;
    use ndarray::{Array2, Array3};

    use super::{ArrayStore, AttributeValue};
    use crate::error::{FrameSyncError, Result};

    pub struct Hdf5Store {
        path: PathBuf,
        file: hdf5::File,
    }

    impl Hdf5Store {
        /// Creates a new file; fails if it already exists.
        pub fn create(path: &Path) -> Result<Self> {
            let file = hdf5::File::create_excl(path).map_err(|e| FrameSyncError::Store {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(Self {
                path: path.to_path_buf(),
                file,
            })
        }

        fn error(&self, message: impl ToString) -> FrameSyncError {
            FrameSyncError::Store {
                path: self.path.clone(),
                message: message.to_string(),
            }
        }

        /// Parent group of `name`, created on demand, and the leaf name.
        fn parent_group(&self, name: &str) -> Result<(hdf5::Group, String)> {
            let mut parts: Vec<String> = Path::new(name)
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            let leaf = parts
                .pop()
                .ok_or_else(|| self.error(format!("invalid entry name '{}'", name)))?;
            let mut group: hdf5::Group = (*self.file).clone();
            for part in parts {
                group = if group.link_exists(&part) {
                    group.group(&part)
                } else {
                    group.create_group(&part)
                }
                .map_err(|e| self.error(e))?;
            }
            Ok((group, leaf))
        }
    }

    impl ArrayStore for Hdf5Store {
        fn put(
            &mut self,
            name: &str,
            image: &DynamicImage,
            attributes: &[(&'static str, AttributeValue)],
        ) -> Result<()> {
            let (group, leaf) = self.parent_group(name)?;
            let (w, h) = (image.width() as usize, image.height() as usize);
            let dataset = match image {
                DynamicImage::ImageLuma8(gray) => {
                    let array = Array2::from_shape_vec((h, w), gray.as_raw().clone())
                        .map_err(|e| self.error(e))?;
                    group
                        .new_dataset_builder()
                        .with_data(&array)
                        .create(leaf.as_str())
                }
                other => {
                    let array = Array3::from_shape_vec((h, w, 3), other.to_rgb8().into_raw())
                        .map_err(|e| self.error(e))?;
                    group
                        .new_dataset_builder()
                        .with_data(&array)
                        .create(leaf.as_str())
                }
            }
            .map_err(|e| self.error(format!("{}: {}", name, e)))?;

            for (key, value) in attributes {
                match value {
                    AttributeValue::Text(text) => {
                        let text: VarLenUnicode = text.parse().map_err(|e| self.error(e))?;
                        dataset
                            .new_attr::<VarLenUnicode>()
                            .shape(())
                            .create(*key)
                            .and_then(|attr| attr.write_scalar(&text))
                    }
                    AttributeValue::Integer(v) => dataset
                        .new_attr::<i64>()
                        .shape(())
                        .create(*key)
                        .and_then(|attr| attr.write_scalar(v)),
                    AttributeValue::Float(v) => dataset
                        .new_attr::<f64>()
                        .shape(())
                        .create(*key)
                        .and_then(|attr| attr.write_scalar(v)),
                }
                .map_err(|e| self.error(format!("{}.{}: {}", name, key, e)))?;
            }
            Ok(())
        }
    }
}
