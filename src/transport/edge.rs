use tracing::debug;

use super::{FragmentPool, RawArena, RawCollector};
use crate::config::{AccessMode, BufferConfig};
use crate::page::checked::{CheckedPageWriter, OutputFragment};
use crate::page::raw::RawPageWriter;
use crate::page::PageOutput;
use crate::types::{EdgeKind, Result};

/// Page writer for one edge, backed by whichever backend the configuration
/// selects.
pub enum EdgeWriter {
    /// Bounds-checked writer over pooled fragments.
    Checked(CheckedPageWriter<FragmentPool>),
    /// Raw-pointer writer over a reused arena.
    Raw(RawPageWriter<RawCollector>),
}

impl EdgeWriter {
    /// Opens a writer for an edge of `kind`, sizing regions from `config`.
    pub fn open(config: &BufferConfig, kind: EdgeKind) -> Result<Self> {
        debug!(
            edge = %kind,
            mode = ?config.access_mode,
            capacity = config.output_buffer_size,
            pages = config.records_per_buffer,
            "transport.edge.open"
        );
        Ok(match config.access_mode {
            AccessMode::Checked => Self::Checked(CheckedPageWriter::with_flush_factor(
                FragmentPool::for_edge(config, kind),
                config.flush_factor,
            )?),
            AccessMode::Raw => {
                let arena = RawArena::new(
                    config.output_buffer_size,
                    config.records_per_buffer,
                    kind.is_keyed(),
                );
                Self::Raw(RawPageWriter::with_flush_factor(
                    RawCollector::new(arena),
                    config.flush_factor,
                )?)
            }
        })
    }

    /// Backend in use.
    pub fn access_mode(&self) -> AccessMode {
        match self {
            Self::Checked(_) => AccessMode::Checked,
            Self::Raw(_) => AccessMode::Raw,
        }
    }

    /// Consumes the writer, returning every batch delivered so far.
    pub fn into_fragments(self) -> Vec<OutputFragment> {
        match self {
            Self::Checked(w) => w.into_sink().take_delivered(),
            Self::Raw(w) => w.into_sink().into_fragments(),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $w:ident => $call:expr) => {
        match $self {
            EdgeWriter::Checked($w) => $call,
            EdgeWriter::Raw($w) => $call,
        }
    };
}

impl PageOutput for EdgeWriter {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        delegate!(self, w => w.write_u8(v))
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        delegate!(self, w => w.write_u16(v))
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        delegate!(self, w => w.write_u32(v))
    }

    fn write_u64(&mut self, v: u64) -> Result<()> {
        delegate!(self, w => w.write_u64(v))
    }

    fn write_slice(&mut self, src: &[u8]) -> Result<()> {
        delegate!(self, w => w.write_slice(src))
    }

    fn end_key(&mut self) -> Result<()> {
        delegate!(self, w => w.end_key())
    }

    fn end_page(&mut self) -> Result<()> {
        delegate!(self, w => w.end_page())
    }

    fn flush(&mut self, end_of_output: bool) -> Result<()> {
        delegate!(self, w => w.flush(end_of_output))
    }

    fn pending_pages(&self) -> usize {
        delegate!(self, w => w.pending_pages())
    }

    fn position(&self) -> usize {
        delegate!(self, w => w.position())
    }
}
