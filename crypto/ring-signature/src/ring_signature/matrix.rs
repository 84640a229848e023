// Copyright (c) 2024 The Veil Foundation

use blake2::{Blake2b512, Digest};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use serde::{Deserialize, Serialize};

use super::Error;
use crate::domain_separators::MLSAG_MATRIX_DIGEST_DOMAIN_TAG;

/// Rows in a ring matrix: one-time keys, then commitment differences.
pub const N_ROWS: usize = 2;

const POINT_SIZE: usize = 32;

/// An `n_rows x n_cols` grid of compressed Ristretto points.
///
/// Entry `(row, col)` lives at byte offset `row * n_cols * 32 + col * 32`.
/// Every access is bounds checked against the capacity fixed at
/// construction.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RingMatrix {
    n_rows: u32,
    n_cols: u32,
    data: Vec<u8>,
}

impl RingMatrix {
    /// A matrix of identity points.
    pub fn new(n_rows: usize, n_cols: usize) -> Result<Self, Error> {
        let capacity = capacity(n_rows, n_cols)?;
        let mut data = vec![0u8; capacity];
        let identity = CompressedRistretto::default();
        for chunk in data.chunks_exact_mut(POINT_SIZE) {
            chunk.copy_from_slice(identity.as_bytes());
        }
        Ok(Self {
            n_rows: to_u32(n_rows)?,
            n_cols: to_u32(n_cols)?,
            data,
        })
    }

    /// Rebuild a matrix from its raw bytes.
    pub fn from_bytes(n_rows: usize, n_cols: usize, data: Vec<u8>) -> Result<Self, Error> {
        let capacity = capacity(n_rows, n_cols)?;
        if data.len() != capacity {
            return Err(Error::LengthMismatch(data.len(), capacity));
        }
        Ok(Self {
            n_rows: to_u32(n_rows)?,
            n_cols: to_u32(n_cols)?,
            data,
        })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows as usize
    }

    /// Number of columns, i.e. the ring size.
    pub fn n_cols(&self) -> usize {
        self.n_cols as usize
    }

    /// The raw row-major bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize, Error> {
        if row >= self.n_rows() || col >= self.n_cols() {
            return Err(Error::IndexOutOfBounds);
        }
        let offset = row * self.n_cols() * POINT_SIZE + col * POINT_SIZE;
        if offset + POINT_SIZE > self.data.len() {
            return Err(Error::IndexOutOfBounds);
        }
        Ok(offset)
    }

    /// Write entry `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, point: &CompressedRistretto) -> Result<(), Error> {
        let offset = self.offset(row, col)?;
        self.data[offset..offset + POINT_SIZE].copy_from_slice(point.as_bytes());
        Ok(())
    }

    /// Read entry `(row, col)` in compressed form.
    pub fn get(&self, row: usize, col: usize) -> Result<CompressedRistretto, Error> {
        let offset = self.offset(row, col)?;
        CompressedRistretto::from_slice(&self.data[offset..offset + POINT_SIZE])
            .map_err(|_| Error::LengthMismatch(self.data.len() - offset, POINT_SIZE))
    }

    /// Read and decompress entry `(row, col)`.
    pub fn point(&self, row: usize, col: usize) -> Result<RistrettoPoint, Error> {
        self.get(row, col)?
            .decompress()
            .ok_or(Error::InvalidCurvePoint)
    }

    /// Decompress every entry, row-major.
    pub fn points(&self) -> Result<Vec<RistrettoPoint>, Error> {
        let mut points = Vec::with_capacity(self.n_rows() * self.n_cols());
        for row in 0..self.n_rows() {
            for col in 0..self.n_cols() {
                points.push(self.point(row, col)?);
            }
        }
        Ok(points)
    }

    /// BLAKE2b-512 digest of the shape and every entry.
    pub fn digest(&self) -> [u8; 64] {
        let mut hasher = Blake2b512::new();
        hasher.update(MLSAG_MATRIX_DIGEST_DOMAIN_TAG);
        hasher.update(self.n_rows.to_le_bytes());
        hasher.update(self.n_cols.to_le_bytes());
        hasher.update(&self.data);
        let mut out = [0u8; 64];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

fn capacity(n_rows: usize, n_cols: usize) -> Result<usize, Error> {
    if n_rows == 0 || n_cols == 0 {
        return Err(Error::IndexOutOfBounds);
    }
    n_rows
        .checked_mul(n_cols)
        .and_then(|n| n.checked_mul(POINT_SIZE))
        .ok_or(Error::IndexOutOfBounds)
}

fn to_u32(n: usize) -> Result<u32, Error> {
    u32::try_from(n).map_err(|_| Error::IndexOutOfBounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, scalar::Scalar};

    fn point(n: u64) -> CompressedRistretto {
        (Scalar::from(n) * RISTRETTO_BASEPOINT_POINT).compress()
    }

    #[test]
    fn test_set_and_get_use_row_major_stride() {
        let mut matrix = RingMatrix::new(N_ROWS, 3).unwrap();
        matrix.set(1, 2, &point(7)).unwrap();
        matrix.set(0, 1, &point(5)).unwrap();

        assert_eq!(matrix.get(1, 2).unwrap(), point(7));
        assert_eq!(matrix.get(0, 1).unwrap(), point(5));
        assert_eq!(&matrix.as_bytes()[(3 + 2) * 32..(3 + 3) * 32], point(7).as_bytes());
        assert_eq!(matrix.get(0, 0).unwrap(), CompressedRistretto::default());
    }

    #[test]
    fn test_out_of_bounds_writes_are_rejected() {
        let mut matrix = RingMatrix::new(N_ROWS, 3).unwrap();
        assert_eq!(matrix.set(2, 0, &point(1)), Err(Error::IndexOutOfBounds));
        assert_eq!(matrix.set(0, 3, &point(1)), Err(Error::IndexOutOfBounds));
        assert_eq!(matrix.get(5, 5), Err(Error::IndexOutOfBounds));
    }

    #[test]
    fn test_empty_shapes_are_rejected() {
        assert_eq!(RingMatrix::new(0, 4), Err(Error::IndexOutOfBounds));
        assert_eq!(RingMatrix::new(2, 0), Err(Error::IndexOutOfBounds));
    }

    #[test]
    fn test_from_bytes_checks_length() {
        let result = RingMatrix::from_bytes(2, 2, vec![0u8; 100]);
        assert_eq!(result, Err(Error::LengthMismatch(100, 128)));

        let matrix = RingMatrix::new(2, 2).unwrap();
        let copy = RingMatrix::from_bytes(2, 2, matrix.as_bytes().to_vec()).unwrap();
        assert_eq!(matrix, copy);
    }

    #[test]
    fn test_digest_covers_contents() {
        let mut matrix = RingMatrix::new(N_ROWS, 2).unwrap();
        let before = matrix.digest();
        matrix.set(1, 1, &point(3)).unwrap();
        assert_ne!(before, matrix.digest());
    }

    #[test]
    fn test_invalid_points_fail_to_decompress() {
        let mut data = vec![0u8; 64];
        data[32..].copy_from_slice(&[0xff; 32]);
        let matrix = RingMatrix::from_bytes(1, 2, data).unwrap();
        assert!(matrix.point(0, 0).is_ok());
        assert_eq!(matrix.point(0, 1), Err(Error::InvalidCurvePoint));
    }
}
