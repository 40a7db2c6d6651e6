#![forbid(unsafe_code)]
//! Buffer sizing and backend selection.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::page::DEFAULT_FLUSH_FACTOR;
use crate::types::{BridgeError, Result};

/// Which page backend a task uses.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Bounds-checked buffers.
    #[default]
    Checked,
    /// Raw base pointers.
    Raw,
}

/// Configuration for page buffers.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    /// Content capacity of each output buffer in bytes
    pub output_buffer_size: usize,
    /// Fill ratio that triggers a flush; clamped by the flush policy
    pub flush_factor: f32,
    /// Maximum pages per output buffer
    pub records_per_buffer: usize,
    /// Number of scatter-gather partitions (and broadcast receivers)
    pub partition_count: usize,
    /// Page backend
    pub access_mode: AccessMode,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            output_buffer_size: 256 * 1024,
            flush_factor: DEFAULT_FLUSH_FACTOR,
            records_per_buffer: 16 * 1024,
            partition_count: 1,
            access_mode: AccessMode::Checked,
        }
    }
}

impl BufferConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(config.normalize())
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Sets the output buffer capacity.
    pub fn output_buffer_size(mut self, bytes: usize) -> Self {
        self.output_buffer_size = bytes;
        self
    }

    /// Sets the flush fill ratio.
    pub fn flush_factor(mut self, factor: f32) -> Self {
        self.flush_factor = factor;
        self
    }

    /// Sets the maximum pages per buffer.
    pub fn records_per_buffer(mut self, records: usize) -> Self {
        self.records_per_buffer = records;
        self
    }

    /// Sets the partition count.
    pub fn partition_count(mut self, partitions: usize) -> Self {
        self.partition_count = partitions;
        self
    }

    /// Sets the page backend.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Raises zero counts to one.
    pub fn normalize(mut self) -> Self {
        if self.records_per_buffer == 0 {
            self.records_per_buffer = 1;
        }
        if self.partition_count == 0 {
            self.partition_count = 1;
        }
        self
    }
}
