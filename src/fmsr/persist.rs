//! The on-disk metadata layout external storage adapters are expected to
//! read and write verbatim: the raw encoding matrix, then the chunk size as
//! a variable-length (unpadded) decimal ASCII string, then — with no
//! separator — the repair hints packed into a fixed 4-digit zero-padded
//! decimal suffix. The hint field's fixed width is what lets [`read_meta`]
//! split the trailing bytes back into `(chunk_size, hints)` without a
//! delimiter: the last 4 bytes are always the hint, everything before that
//! is the chunk size.

use super::RepairHints;
use crate::error::FmsrError;

const HINT_FIELD_WIDTH: usize = 4;

/// Serializes `(encode_matrix, chunk_size, hints)` into the byte layout a
/// storage adapter would persist alongside the coded chunks themselves:
/// the raw matrix bytes, then the chunk size as unpadded decimal ASCII,
/// then the hints packed as `last_repaired * 10 + last_used`, left-padded
/// with `'0'` to 4 digits.
pub fn write_meta(encode_matrix: &[u8], chunk_size: usize, hints: RepairHints) -> Vec<u8> {
    let mut out = Vec::with_capacity(encode_matrix.len() + HINT_FIELD_WIDTH + 8);
    out.extend_from_slice(encode_matrix);
    out.extend_from_slice(chunk_size.to_string().as_bytes());
    let hint_value = hints.last_repaired as u32 * 10 + hints.last_used as u32;
    out.extend_from_slice(format!("{hint_value:0>width$}", width = HINT_FIELD_WIDTH).as_bytes());
    out
}

/// Inverse of [`write_meta`]. `nc` and `nn` name the shape of the encoding
/// matrix this metadata blob is expected to carry.
pub fn read_meta(bytes: &[u8], nc: usize, nn: usize) -> Result<(Vec<u8>, usize, RepairHints), FmsrError> {
    let matrix_len = nc * nn;
    if bytes.len() < matrix_len + HINT_FIELD_WIDTH {
        return Err(FmsrError::MalformedMetadata);
    }

    let matrix = bytes[..matrix_len].to_vec();
    let trailing = &bytes[matrix_len..];
    let split = trailing.len() - HINT_FIELD_WIDTH;
    let chunk_size_field = &trailing[..split];
    let hint_field = &trailing[split..];

    let chunk_size_str = std::str::from_utf8(chunk_size_field).map_err(|_| FmsrError::MalformedMetadata)?;
    let chunk_size: usize = chunk_size_str.parse().map_err(|_| FmsrError::MalformedMetadata)?;

    let hint_str = std::str::from_utf8(hint_field).map_err(|_| FmsrError::MalformedMetadata)?;
    let hint_value: u32 = hint_str.parse().map_err(|_| FmsrError::MalformedMetadata)?;
    let hints = RepairHints {
        last_repaired: (hint_value / 10) as u8,
        last_used: (hint_value % 10) as u8,
    };

    Ok((matrix, chunk_size, hints))
}
