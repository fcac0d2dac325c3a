//! Dense row-major matrices of GF(2^8) symbols and the operations the FMSR
//! core needs: multiplication (serial and parallel), inversion, rank, and
//! lexicographic enumeration of row-index combinations with exclusions.

use crate::error::FmsrError;
use crate::field;
use rayon::prelude::*;

/// `c = a * b`, where `a` is `rows x k`, `b` is `k x cols`, `c` is `rows x cols`,
/// all row-major. Streams `mulxor_bytes` along the row dimension.
pub fn mul(a: &[u8], b: &[u8], c: &mut [u8], rows: usize, k: usize, cols: usize) {
    assert_eq!(a.len(), rows * k);
    assert_eq!(b.len(), k * cols);
    assert_eq!(c.len(), rows * cols);
    for row in c.chunks_mut(cols) {
        row.fill(0);
    }
    for i in 0..rows {
        let c_row = &mut c[i * cols..(i + 1) * cols];
        for j in 0..k {
            let coeff = a[i * k + j];
            if coeff == 0 {
                continue;
            }
            let b_row = &b[j * cols..(j + 1) * cols];
            field::mulxor_bytes(b_row, coeff, c_row);
        }
    }
}

/// Same contract as [`mul`], but fans the `cols` output columns out across a
/// rayon thread pool with `workers` roughly-equal column slabs. Produces
/// bit-identical output to `mul` for the same inputs.
pub fn mul_parallel(
    a: &[u8],
    b: &[u8],
    c: &mut [u8],
    rows: usize,
    k: usize,
    cols: usize,
    workers: usize,
) {
    assert_eq!(a.len(), rows * k);
    assert_eq!(b.len(), k * cols);
    assert_eq!(c.len(), rows * cols);
    let workers = workers.max(1).min(cols.max(1));
    if workers <= 1 {
        mul(a, b, c, rows, k, cols);
        return;
    }

    let base = cols / workers;
    let leftover = cols - workers * base;
    let mut bounds = Vec::with_capacity(workers + 1);
    bounds.push(0usize);
    for i in 0..workers {
        let width = base + if i < leftover { 1 } else { 0 };
        bounds.push(bounds[i] + width);
    }

    let slabs: Vec<(usize, usize)> = (0..workers).map(|i| (bounds[i], bounds[i + 1])).collect();
    let mut slab_bufs: Vec<Vec<u8>> = slabs.iter().map(|(s, e)| vec![0u8; rows * (e - s)]).collect();

    slab_bufs
        .par_iter_mut()
        .zip(slabs.par_iter())
        .for_each(|(buf, &(start, end))| {
            let width = end - start;
            for i in 0..rows {
                let out_row = &mut buf[i * width..(i + 1) * width];
                out_row.fill(0);
                for j in 0..k {
                    let coeff = a[i * k + j];
                    if coeff == 0 {
                        continue;
                    }
                    let b_row = &b[j * cols + start..j * cols + end];
                    field::mulxor_bytes(b_row, coeff, out_row);
                }
            }
        });

    for (buf, (start, end)) in slab_bufs.iter().zip(slabs.iter()) {
        let width = end - start;
        for i in 0..rows {
            c[i * cols + start..i * cols + end].copy_from_slice(&buf[i * width..(i + 1) * width]);
        }
    }
}

/// Inverts the `k x k` matrix `a` in place via Gauss-Jordan elimination
/// (augment with the identity, eliminate, read the right half back out).
/// Fails iff `a` is singular; on failure `a` is left unspecified.
pub fn invert(a: &mut [u8], k: usize) -> Result<(), FmsrError> {
    assert_eq!(a.len(), k * k);
    let mut aug = vec![0u8; k * 2 * k];
    for i in 0..k {
        aug[i * 2 * k..i * 2 * k + k].copy_from_slice(&a[i * k..(i + 1) * k]);
        aug[i * 2 * k + k + i] = 1;
    }

    let rank = gauss_jordan(&mut aug, k, 2 * k);
    if rank < k {
        return Err(FmsrError::SingularSubmatrix);
    }

    for i in 0..k {
        a[i * k..(i + 1) * k].copy_from_slice(&aug[i * 2 * k + k..i * 2 * k + 2 * k]);
    }
    Ok(())
}

/// Rank of the `n x m` matrix `a`. Operates on a copy.
pub fn rank(a: &[u8], n: usize, m: usize) -> usize {
    let mut copy = a.to_vec();
    gaussian_elimination(&mut copy, n, m)
}

// Maintains the invariant that every leading (non-zero) entry in a row is 1.
// Instead of swapping rows when a higher row has a zero in the pivot column,
// the chosen row is added into the pivot row directly (equivalent over
// GF(2^8) and keeps the invariant intact without a swap).
fn gaussian_elimination(a: &mut [u8], n: usize, m: usize) -> usize {
    for i in 0..n {
        let row = &mut a[i * m..(i + 1) * m];
        if let Some(j) = row.iter().position(|&v| v != 0) {
            if row[j] != 1 {
                let inv = field::inv(row[j]);
                let (_, suffix) = row.split_at_mut(j);
                let copy = suffix.to_vec();
                field::mul_bytes(&copy, inv, suffix);
            }
        }
    }

    let mut rank = m;
    for i in 0..m {
        let mut first = None;
        for row in i..n {
            if a[row * m + i] != 0 {
                first = Some(row);
                break;
            }
        }
        let Some(first) = first else {
            rank -= 1;
            continue;
        };
        if first != i {
            let other: Vec<u8> = a[first * m + i..first * m + m].to_vec();
            for (col, v) in other.into_iter().enumerate() {
                a[i * m + i + col] ^= v;
            }
        }

        for j in (i + 1)..n {
            if a[j * m + i] == 0 {
                continue;
            }
            a[j * m + i] = 0;
            let mut inv_val = 0u8;
            for col in (i + 1)..m {
                a[j * m + col] ^= a[i * m + col];
                if inv_val == 0 && a[j * m + col] != 0 {
                    inv_val = field::inv(a[j * m + col]);
                }
            }
            if inv_val != 0 {
                let start = j * m + i + 1;
                let len = m - (i + 1);
                let copy: Vec<u8> = a[start..start + len].to_vec();
                field::mul_bytes(&copy, inv_val, &mut a[start..start + len]);
            }
        }
    }
    rank
}

fn gauss_jordan(a: &mut [u8], n: usize, m: usize) -> usize {
    let rank = gaussian_elimination(a, n, m);
    if rank == 0 {
        return rank;
    }
    for i in (1..rank).rev() {
        let mut first = i;
        while a[i * m + first] == 0 {
            first += 1;
        }
        let len = m - first;
        let pivot_row: Vec<u8> = a[i * m + first..i * m + first + len].to_vec();
        for j in 0..i {
            let coeff = a[j * m + first];
            if coeff == 0 {
                continue;
            }
            let start = j * m + first;
            field::mulxor_bytes(&pivot_row, coeff, &mut a[start..start + len]);
        }
    }
    rank
}

/// Advances `comb` in place to the next strictly increasing `k`-combination
/// of `{0..rows-1} \ excluded`, in lexicographic order, and writes the
/// selected rows (each of width `cols`) into `out`. `comb` must initially
/// hold a valid combination (e.g. the first `k` allowed indices). Returns
/// `false` once combinations are exhausted (leaving `comb`/`out` untouched).
pub fn next_submatrix(
    matrix: &[u8],
    rows: usize,
    cols: usize,
    k: usize,
    excluded: &[usize],
    comb: &mut [usize],
    out: &mut [u8],
) -> bool {
    if !next_comb(comb, rows, k, excluded) {
        return false;
    }
    for i in 0..k {
        let src = &matrix[comb[i] * cols..(comb[i] + 1) * cols];
        out[i * cols..(i + 1) * cols].copy_from_slice(src);
    }
    true
}

/// First valid `k`-combination of `{0..rows-1} \ excluded`, for seeding
/// `next_submatrix`'s `comb` argument. Returns `None` if no such combination
/// exists (fewer than `k` indices available).
pub fn first_combination(rows: usize, k: usize, excluded: &[usize]) -> Option<Vec<usize>> {
    let allowed = allowed_indices(rows, excluded);
    if allowed.len() < k {
        return None;
    }
    Some(allowed[..k].to_vec())
}

fn allowed_indices(rows: usize, excluded: &[usize]) -> Vec<usize> {
    (0..rows).filter(|i| !excluded.contains(i)).collect()
}

// Iterative next-combination search over the restricted universe
// `{0..rows-1} \ excluded`: reduce to the standard textbook
// next-combination recurrence by working with positions into the list of
// allowed indices, then map back to actual row indices.
fn next_comb(comb: &mut [usize], rows: usize, k: usize, excluded: &[usize]) -> bool {
    if k == 0 {
        return false;
    }
    let allowed = allowed_indices(rows, excluded);
    let universe = allowed.len();
    if universe < k {
        return false;
    }

    let mut positions: Vec<usize> = comb
        .iter()
        .map(|&v| allowed.iter().position(|&a| a == v).expect("comb must hold allowed indices"))
        .collect();

    let mut pos = k;
    loop {
        if pos == 0 {
            return false;
        }
        pos -= 1;
        if positions[pos] + (k - pos) < universe {
            positions[pos] += 1;
            for slot in (pos + 1)..k {
                positions[slot] = positions[slot - 1] + 1;
            }
            for (slot, &p) in positions.iter().enumerate() {
                comb[slot] = allowed[p];
            }
            return true;
        }
    }
}
