//! Exact (brute-force) squared-L2 vector index with a compact binary file format.
//!
//! ## File layout
//!
//! ```text
//! offset  size        field
//! 0       4           magic "CLVX"
//! 4       4           format version (u32 LE, currently 1)
//! 8       4           dimension (u32 LE)
//! 12      8           vector count (u64 LE)
//! 20      4*d*count   f32 components, row-major, little-endian
//! ```
//!
//! Distances are squared Euclidean, so a returned distance of `0.0` means an
//! identical vector and values grow without bound.

use super::{Neighbor, VectorIndex};
use crate::error::{Result, RetrieverError};
use caselens_embed::Vector;
use itertools::Itertools;
use std::path::Path;
use tracing::debug;

const MAGIC: &[u8; 4] = b"CLVX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        if cfg!(target_endian = "little") {
            bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        } else {
            for value in &self.data {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        bytes
    }

    /// Decode an index previously produced by [`to_bytes`](Self::to_bytes).
    ///
    /// `origin` only labels errors.
    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self> {
        let invalid = |message: String| RetrieverError::invalid_artifact(origin, message);

        if bytes.len() < HEADER_LEN {
            return Err(invalid(format!("truncated header ({} bytes)", bytes.len())));
        }
        if &bytes[0..4] != MAGIC {
            return Err(invalid("not a caselens vector index".to_string()));
        }

        let read_u32 = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(buf)
        };
        let version = read_u32(4);
        if version != FORMAT_VERSION {
            return Err(invalid(format!("unsupported format version {version}")));
        }
        let dimension = read_u32(8) as usize;
        let mut count_buf = [0u8; 8];
        count_buf.copy_from_slice(&bytes[12..20]);
        let count = u64::from_le_bytes(count_buf) as usize;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| invalid("vector count overflows".to_string()))?;
        if body.len() != expected {
            return Err(invalid(format!(
                "expected {expected} bytes of vector data for {count}x{dimension}, found {}",
                body.len()
            )));
        }

        let mut data = vec![0f32; count * dimension];
        if cfg!(target_endian = "little") {
            bytemuck::cast_slice_mut::<f32, u8>(&mut data).copy_from_slice(body);
        } else {
            for (value, raw) in data.iter_mut().zip(body.chunks_exact(4)) {
                *value = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            }
        }

        Ok(Self { dimension, data })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let index = Self::from_bytes(&bytes, path)?;
        debug!(
            "Loaded {} vectors (dimension {}) from {}",
            index.len(),
            index.dimension,
            path.display()
        );
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        super::atomic::write_atomic(path, &self.to_bytes())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn add(&mut self, vectors: &[Vector]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RetrieverError::inconsistency(format!(
                "cannot add a {}-dimensional vector to a {}-dimensional index",
                bad.len(),
                self.dimension
            )));
        }
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Exact k-NN. Ties on distance keep insertion order.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(RetrieverError::inconsistency(format!(
                "query has dimension {} but index has {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.dimension == 0 {
            return Ok(Vec::new());
        }

        let neighbors = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(query, row),
            })
            .sorted_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then(a.position.cmp(&b.position))
            })
            .take(k)
            .collect();
        Ok(neighbors)
    }
}
