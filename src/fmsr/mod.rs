//! FMSR encode/decode/repair core: Cauchy encoding matrices, the padding
//! convention, and the thin encode/decode entry points. The repair
//! coefficient search and its MDS-family feasibility checks live in
//! [`repair`]; the persisted on-disk layout lives in [`persist`].

pub mod persist;
pub mod repair;

use crate::config::FmsrConfig;
use crate::error::FmsrError;
use crate::field;
use crate::matrix;
use log::{debug, warn};

pub use repair::{repair as repair_node, RepairOutcome};

/// Hints from a previous repair round, used to decide which of the two
/// chunks on each surviving node to retrieve next. `last_repaired == 255`
/// means "no prior repair".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairHints {
    pub last_repaired: u8,
    pub last_used: u8,
}

impl Default for RepairHints {
    fn default() -> Self {
        Self {
            last_repaired: 255,
            last_used: 0,
        }
    }
}

/// Returns `true` if `(k, n)` is in the supported FMSR regime: `n - k == 2`,
/// `n >= 4`. The reference implementation additionally requires `n <= 127`
/// so that `n * (n - k) < 256` fits in a chunk index byte.
pub fn encode_support(k: u8, n: u8) -> bool {
    (n as i16) - (k as i16) == 2 && n >= 4 && (n as u16) * 2 < 256
}

pub fn repair_support(k: u8, n: u8, num_erasures: u8) -> bool {
    encode_support(k, n) && num_erasures == 1
}

/// Number of chunks stored per node (always 2 in the supported regime),
/// or `None` if `(k, n)` is unsupported.
pub fn chunks_per_node(k: u8, n: u8) -> Option<u8> {
    if encode_support(k, n) {
        Some(n - k)
    } else {
        None
    }
}

/// Id of the node holding coded chunk `index`, or `None` if unsupported.
pub fn nodeid(k: u8, n: u8, index: u8) -> Option<u8> {
    chunks_per_node(k, n).map(|cpn| index / cpn)
}

/// The two chunk indices stored on `node`, or `None` if unsupported.
pub fn chunks_on_node(k: u8, n: u8, node: u8) -> Option<Vec<u8>> {
    let cpn = chunks_per_node(k, n)?;
    Some((0..cpn).map(|i| node * cpn + i).collect())
}

/// Number of native (data) chunks.
pub fn nn(k: u8, n: u8) -> u8 {
    k * (n - k)
}

/// Number of coded chunks.
pub fn nc(k: u8, n: u8) -> u8 {
    n * (n - k)
}

/// Length of `size` after padding: always a multiple of `nn(k, n)`, and
/// always strictly greater than `size` (the pad sentinel always fits).
pub fn padded_size(k: u8, n: u8, size: usize) -> usize {
    let nn = nn(k, n) as usize;
    (size / nn + 1) * nn
}

/// Builds the `nc x nn` Cauchy encoding matrix `E[i,j] = 1 / (i ^ (255 - j))`.
/// Any square submatrix of a Cauchy matrix is invertible, which gives the
/// initial MDS property encode/decode rely on.
pub fn create_encode_matrix(k: u8, n: u8) -> Result<Vec<u8>, FmsrError> {
    if !encode_support(k, n) {
        return Err(FmsrError::UnsupportedParams { k, n });
    }
    field::init();
    let rows = nc(k, n) as usize;
    let cols = nn(k, n) as usize;
    let mut m = vec![0u8; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            m[i * cols + j] = field::div(1, (i as u8) ^ (255 - j as u8));
        }
    }
    Ok(m)
}

/// Appends the pad sentinel (`0x01`) and zero-fills up to `padded_size`.
pub fn pad(k: u8, n: u8, data: &[u8]) -> Vec<u8> {
    let mut padded = vec![0u8; padded_size(k, n, data.len())];
    padded[..data.len()].copy_from_slice(data);
    padded[data.len()] = 1;
    padded
}

/// Recovers the true length of a padded buffer. If the final byte is
/// non-zero and not the `0x01` sentinel, the buffer is considered corrupt
/// and `0` is returned — this asymmetry is what makes `pad` injective for
/// file sizes that are multiples of `nn`.
pub fn unpad(data: &[u8]) -> usize {
    if data.is_empty() {
        return 0;
    }
    let last = data[data.len() - 1];
    if last != 0 {
        return if last == 1 { data.len() - 1 } else { 0 };
    }
    for i in (0..data.len()).rev() {
        if data[i] != 0 {
            return i;
        }
    }
    0
}

/// Encodes `data` into `nc(k,n)` coded chunks. If `create_new`, a fresh
/// Cauchy matrix is generated and returned alongside the code chunks;
/// otherwise `matrix` (an existing `nc x nn` encoding matrix) is used as-is.
///
/// Returns `(code_chunks, matrix_used, chunk_size)`.
pub fn encode(
    k: u8,
    n: u8,
    data: &[u8],
    create_new: bool,
    matrix_in: Option<Vec<u8>>,
    cfg: &FmsrConfig,
) -> Result<(Vec<u8>, Vec<u8>, usize), FmsrError> {
    cfg.validate()?;
    if !encode_support(k, n) {
        return Err(FmsrError::UnsupportedParams { k, n });
    }
    let nn = nn(k, n) as usize;
    let nc = nc(k, n) as usize;

    let enc_matrix = if create_new {
        create_encode_matrix(k, n)?
    } else {
        let m = matrix_in.ok_or(FmsrError::MissingDecodeMatrix)?;
        if m.len() != nc * nn {
            return Err(FmsrError::UnsupportedParams { k, n });
        }
        m
    };

    let padded = pad(k, n, data);
    let chunk_size = padded.len() / nn;
    let mut code_chunks = vec![0u8; nc * chunk_size];
    if cfg.workers > 1 {
        matrix::mul_parallel(
            &enc_matrix,
            &padded,
            &mut code_chunks,
            nc,
            nn,
            chunk_size,
            cfg.workers,
        );
    } else {
        matrix::mul(&enc_matrix, &padded, &mut code_chunks, nc, nn, chunk_size);
    }
    debug!("encoded {} bytes into {} chunks of {} bytes", data.len(), nc, chunk_size);

    Ok((code_chunks, enc_matrix, chunk_size))
}

/// Decodes the original data from `nn(k,n)` or more retrieved coded chunks.
///
/// `chunk_indices[i]` names which row of `encode_matrix` produced
/// `code_chunks`'s `i`-th chunk. If `decode_matrix` is supplied and
/// `create_new` is false, it's used directly (must already be the correct
/// `nn x nn` inverse); otherwise a fresh decode matrix is derived from
/// `encode_matrix` and returned to the caller for reuse.
#[allow(clippy::too_many_arguments)]
pub fn decode(
    k: u8,
    n: u8,
    code_chunks: &[u8],
    chunk_size: usize,
    chunk_indices: &[u8],
    encode_matrix: Option<&[u8]>,
    decode_matrix: Option<Vec<u8>>,
    create_new: bool,
    cfg: &FmsrConfig,
) -> Result<(Vec<u8>, Vec<u8>), FmsrError> {
    cfg.validate()?;
    let nn = nn(k, n) as usize;
    let nc = nc(k, n) as usize;
    if chunk_indices.len() < nn {
        return Err(FmsrError::TooFewChunks {
            got: chunk_indices.len() as u8,
            need: nn as u8,
        });
    }

    let submatrix = if create_new {
        let encode_matrix = encode_matrix.ok_or(FmsrError::MissingDecodeMatrix)?;
        let mut sub = vec![0u8; nn * nn];
        for i in 0..nn {
            let idx = chunk_indices[i] as usize;
            if idx >= nc {
                return Err(FmsrError::BadChunkIndex(chunk_indices[i]));
            }
            sub[i * nn..(i + 1) * nn].copy_from_slice(&encode_matrix[idx * nn..(idx + 1) * nn]);
        }
        matrix::invert(&mut sub, nn)?;
        sub
    } else {
        decode_matrix.ok_or(FmsrError::MissingDecodeMatrix)?
    };

    let mut data = vec![0u8; nn * chunk_size];
    if cfg.workers > 1 {
        matrix::mul_parallel(
            &submatrix,
            &code_chunks[..nn * chunk_size],
            &mut data,
            nn,
            nn,
            chunk_size,
            cfg.workers,
        );
    } else {
        matrix::mul(&submatrix, &code_chunks[..nn * chunk_size], &mut data, nn, nn, chunk_size);
    }

    let true_size = unpad(&data);
    if true_size == 0 && !data.is_empty() {
        warn!("decode: unpad reported a corrupt trailing byte");
    }
    data.truncate(true_size);
    Ok((data, submatrix))
}

/// Regenerates `rows` new code chunks from `retrieved_chunks` via a single
/// matrix multiply, `new_chunks = repair_matrix * retrieved_chunks`.
pub fn regenerate(
    repair_matrix: &[u8],
    rows: usize,
    cols: usize,
    retrieved_chunks: &[u8],
    chunk_size: usize,
    cfg: &FmsrConfig,
) -> Vec<u8> {
    let mut out = vec![0u8; rows * chunk_size];
    if cfg.workers > 1 {
        matrix::mul_parallel(
            repair_matrix,
            retrieved_chunks,
            &mut out,
            rows,
            cols,
            chunk_size,
            cfg.workers,
        );
    } else {
        matrix::mul(repair_matrix, retrieved_chunks, &mut out, rows, cols, chunk_size);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn setup() {
        field::init();
    }

    #[test]
    fn fixed_vector_roundtrip_2_4() {
        setup();
        let cfg = FmsrConfig {
            workers: 1,
            ..FmsrConfig::default()
        };
        let data = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let (code_chunks, matrix, chunk_size) = encode(2, 4, &data, true, None, &cfg).unwrap();
        let indices: Vec<u8> = (0..nc(2, 4)).collect();
        let (decoded, _) = decode(
            2,
            4,
            &code_chunks,
            chunk_size,
            &indices,
            Some(&matrix),
            None,
            true,
            &cfg,
        )
        .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn encode_decode_roundtrip_random_subset() {
        setup();
        let cfg = FmsrConfig {
            workers: 1,
            ..FmsrConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<u8> = (0..4096).map(|_| rng.gen()).collect();
        let (code_chunks, matrix, chunk_size) = encode(2, 4, &data, true, None, &cfg).unwrap();
        let nn = nn(2, 4) as usize;
        let mut all: Vec<u8> = (0..nc(2, 4)).collect();
        // shuffle deterministically
        for i in (1..all.len()).rev() {
            let j = rng.gen_range(0..=i);
            all.swap(i, j);
        }
        let chosen: Vec<u8> = all[..nn].to_vec();
        let mut chunks = vec![0u8; nn * chunk_size];
        for (slot, &idx) in chosen.iter().enumerate() {
            let row = idx as usize;
            chunks[slot * chunk_size..(slot + 1) * chunk_size]
                .copy_from_slice(&code_chunks[row * chunk_size..(row + 1) * chunk_size]);
        }
        let (decoded, _) = decode(
            2,
            4,
            &chunks,
            chunk_size,
            &chosen,
            Some(&matrix),
            None,
            true,
            &cfg,
        )
        .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn padding_idempotence() {
        for size in [0usize, 1, 3, 4, 5, 7, 8, 100] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let padded = pad(2, 4, &data);
            assert_eq!(unpad(&padded), size);
        }
    }

    #[test]
    fn unpad_rejects_non_sentinel_trailing_byte() {
        let corrupt = [1u8, 2, 3, 5];
        assert_eq!(unpad(&corrupt), 0);
    }

    #[test]
    fn unpad_accepts_sentinel_trailing_byte() {
        let buf = [1u8, 2, 3, 1];
        assert_eq!(unpad(&buf), 3);
    }

    #[test]
    fn helpers_match_reference_formulas() {
        assert_eq!(nn(2, 4), 4);
        assert_eq!(nc(2, 4), 8);
        assert_eq!(chunks_per_node(2, 4), Some(2));
        assert_eq!(nodeid(2, 4, 5), Some(2));
        assert_eq!(chunks_on_node(2, 4, 2), Some(vec![4, 5]));
        assert_eq!(chunks_per_node(3, 10), None); // n-k=7, unsupported
    }

    #[test]
    fn unsupported_params_rejected() {
        assert!(!encode_support(3, 10));
        assert!(create_encode_matrix(3, 10).is_err());
    }
}
