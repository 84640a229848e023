// Copyright (c) 2024 The Veil Foundation

//! MLSAG (Multilayered Linkable Spontaneous Anonymous Group) signatures over
//! a two-row ring matrix.
//!
//! Row 0 holds the one-time public keys `P[i]` of the ring members, row 1
//! holds `Z[i] = C_in[i] - sum(C_out)`. At the real column the signer knows
//! `x` with `P = x*G` and `z` with `Z = z*G`, proving ownership of the input
//! and, at the same time, that the outputs commit to the input value.
//!
//! Only row 0 is linkable: the key image `I = x*Hp(P)` is published.
//!
//! For each column `i` the verifier recomputes
//!
//! ```text
//! L0 = s[0][i]*G + c[i]*P[i]
//! R0 = s[0][i]*Hp(P[i]) + c[i]*I
//! L1 = s[1][i]*G + c[i]*Z[i]
//! c[i+1] = Hs(tag || pre_image || digest(matrix) || I || L0 || R0 || L1)
//! ```
//!
//! and accepts if the ring closes on the published challenge `c[0]`.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar, traits::Identity};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use serde::{Deserialize, Serialize};
use veil_account_keys::{RistrettoPrivate, RistrettoPublic};
use zeroize::{Zeroize, ZeroizeOnDrop};

use blake2::{Blake2b512, Digest};

use super::{hash_to_point, Error, KeyImage, RingMatrix, RingStage, B_BLINDING, N_ROWS};
use crate::domain_separators::MLSAG_ROUND_HASH_DOMAIN_TAG;

/// A completed MLSAG signature.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MlsagSignature {
    /// Key image of the spent one-time key.
    pub key_image: KeyImage,
    /// The initial challenge `c[0]`.
    pub challenge: Scalar,
    /// Responses `s[row][col]`, row-major, `n_rows * n_cols` entries.
    pub responses: Vec<Scalar>,
}

/// A ring matrix whose commitment row has been filled in, ready to sign.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mlsag {
    #[zeroize(skip)]
    matrix: RingMatrix,
    commitment_secret: Scalar,
}

impl Mlsag {
    /// Validate shapes and fill the commitment row.
    ///
    /// On entry row 1 of `matrix` holds each ring member's input commitment.
    /// It is replaced in place by `C_in[col] - sum(output_commitments)`.
    /// `blind_sum` is the secret opening of that difference at the real
    /// column: the input blind minus the sum of output blinds.
    pub fn prepare(
        mut matrix: RingMatrix,
        blind_sum: &Scalar,
        output_commitments: &[RistrettoPoint],
        n_cols: usize,
        n_rows: usize,
    ) -> Result<Self, Error> {
        if n_rows != N_ROWS {
            return Err(Error::ring(
                RingStage::Prepare,
                format!("expected {N_ROWS} rows, found {n_rows}"),
            ));
        }
        if matrix.n_rows() != n_rows || matrix.n_cols() != n_cols {
            return Err(Error::ring(
                RingStage::Prepare,
                format!(
                    "matrix is {}x{}, expected {n_rows}x{n_cols}",
                    matrix.n_rows(),
                    matrix.n_cols()
                ),
            ));
        }
        if n_cols < 2 {
            return Err(Error::ring(
                RingStage::Prepare,
                "ring must have at least two members",
            ));
        }
        if output_commitments.is_empty() {
            return Err(Error::ring(RingStage::Prepare, "no output commitments"));
        }

        let output_sum: RistrettoPoint = output_commitments.iter().sum();
        for col in 0..n_cols {
            let input = matrix
                .point(1, col)
                .map_err(|e| Error::ring(RingStage::Prepare, e.to_string()))?;
            matrix
                .set(1, col, &(input - output_sum).compress())
                .map_err(|e| Error::ring(RingStage::Prepare, e.to_string()))?;
        }

        Ok(Self {
            matrix,
            commitment_secret: *blind_sum,
        })
    }

    /// The prepared matrix.
    pub fn matrix(&self) -> &RingMatrix {
        &self.matrix
    }

    /// Give up the prepared matrix, e.g. to embed it in a transaction.
    pub fn into_matrix(self) -> RingMatrix {
        self.matrix.clone()
    }

    /// Sign with the one-time key `onetime_private_key` at `real_index`.
    ///
    /// `seed` drives every nonce and decoy response; `pre_image` is bound
    /// into each round hash.
    pub fn generate(
        &self,
        real_index: usize,
        onetime_private_key: &RistrettoPrivate,
        pre_image: &[u8; 32],
        seed: [u8; 32],
    ) -> Result<MlsagSignature, Error> {
        let n_cols = self.matrix.n_cols();
        let n_rows = self.matrix.n_rows();
        if real_index >= n_cols {
            return Err(Error::ring(
                RingStage::Generate,
                format!("real index {real_index} outside ring of {n_cols}"),
            ));
        }

        let G = B_BLINDING;
        let points = self
            .matrix
            .points()
            .map_err(|e| Error::ring(RingStage::Generate, e.to_string()))?;
        let (keys, diffs) = points.split_at(n_cols);

        let x = onetime_private_key.as_ref();
        let z = &self.commitment_secret;
        if RistrettoPoint::mul_base(x) != keys[real_index] {
            return Err(Error::ring(
                RingStage::Generate,
                "one-time key does not match the real column",
            ));
        }
        if RistrettoPoint::mul_base(z) != diffs[real_index] {
            return Err(Error::ring(
                RingStage::Generate,
                "blind sum does not open the commitment difference",
            ));
        }

        let key_image = KeyImage::from(onetime_private_key);
        let I = key_image
            .decompress()
            .map_err(|e| Error::ring(RingStage::Generate, e.to_string()))?;
        let hashed_keys: Vec<RistrettoPoint> = keys
            .iter()
            .map(|P| hash_to_point(&RistrettoPublic::from(*P)))
            .collect();
        let digest = self.matrix.digest();

        let mut rng = ChaCha20Rng::from_seed(seed);
        let mut responses: Vec<Scalar> = (0..n_rows * n_cols)
            .map(|_| Scalar::random(&mut rng))
            .collect();
        let mut alpha = [Scalar::random(&mut rng), Scalar::random(&mut rng)];

        let mut challenges = vec![Scalar::ZERO; n_cols];
        challenges[(real_index + 1) % n_cols] = round_hash(
            pre_image,
            &digest,
            &key_image,
            &(alpha[0] * G),
            &(alpha[0] * hashed_keys[real_index]),
            &(alpha[1] * G),
        );

        for n in 1..n_cols {
            let i = (real_index + n) % n_cols;
            let c = challenges[i];
            let s0 = responses[i];
            let s1 = responses[n_cols + i];

            let L0 = s0 * G + c * keys[i];
            let R0 = s0 * hashed_keys[i] + c * I;
            let L1 = s1 * G + c * diffs[i];

            challenges[(i + 1) % n_cols] = round_hash(pre_image, &digest, &key_image, &L0, &R0, &L1);
        }

        let c_real = challenges[real_index];
        responses[real_index] = alpha[0] - c_real * x;
        responses[n_cols + real_index] = alpha[1] - c_real * z;
        alpha.zeroize();

        Ok(MlsagSignature {
            key_image,
            challenge: challenges[0],
            responses,
        })
    }

    /// Check `responses` against `matrix`, recomputing every challenge.
    pub fn verify(
        challenge: &Scalar,
        n_cols: usize,
        n_rows: usize,
        matrix: &RingMatrix,
        key_image: &KeyImage,
        pre_image: &[u8; 32],
        responses: &[Scalar],
    ) -> Result<(), Error> {
        if n_rows != N_ROWS || matrix.n_rows() != n_rows || matrix.n_cols() != n_cols {
            return Err(Error::ring(RingStage::Verify, "matrix shape mismatch"));
        }
        if responses.len() != n_rows * n_cols {
            return Err(Error::ring(
                RingStage::Verify,
                format!(
                    "expected {} responses, found {}",
                    n_rows * n_cols,
                    responses.len()
                ),
            ));
        }

        let G = B_BLINDING;
        let I = key_image
            .decompress()
            .map_err(|e| Error::ring(RingStage::Verify, e.to_string()))?;
        if I == RistrettoPoint::identity() {
            return Err(Error::ring(RingStage::Verify, "identity key image"));
        }
        let points = matrix
            .points()
            .map_err(|e| Error::ring(RingStage::Verify, e.to_string()))?;
        let (keys, diffs) = points.split_at(n_cols);
        let digest = matrix.digest();

        let mut c = *challenge;
        for i in 0..n_cols {
            let s0 = responses[i];
            let s1 = responses[n_cols + i];
            let Hp = hash_to_point(&RistrettoPublic::from(keys[i]));

            let L0 = s0 * G + c * keys[i];
            let R0 = s0 * Hp + c * I;
            let L1 = s1 * G + c * diffs[i];

            c = round_hash(pre_image, &digest, key_image, &L0, &R0, &L1);
        }

        if c == *challenge {
            Ok(())
        } else {
            Err(Error::ring(RingStage::Verify, "challenge mismatch"))
        }
    }
}

fn round_hash(
    pre_image: &[u8; 32],
    digest: &[u8; 64],
    key_image: &KeyImage,
    L0: &RistrettoPoint,
    R0: &RistrettoPoint,
    L1: &RistrettoPoint,
) -> Scalar {
    let mut hasher = Blake2b512::new();
    hasher.update(MLSAG_ROUND_HASH_DOMAIN_TAG);
    hasher.update(pre_image);
    hasher.update(digest);
    hasher.update(key_image.as_bytes());
    hasher.update(L0.compress().as_bytes());
    hasher.update(R0.compress().as_bytes());
    hasher.update(L1.compress().as_bytes());
    Scalar::from_hash(hasher)
}
