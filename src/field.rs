//! Arithmetic in GF(2^8) with the primitive polynomial
//! `x^8 + x^4 + x^3 + x^2 + 1` (0x11D).
//!
//! Tables are built once behind a `std::sync::Once` guard and are read-only
//! afterwards, so every operation here is safe to call from any thread once
//! [`init`] has returned at least once.

use crate::optimize::{self, SimdPolicy};
use std::sync::Once;

const GF_ORDER: usize = 256;
const IRREDUCIBLE_POLY: u16 = 0x11D;

static mut LOG_TABLE: [u8; GF_ORDER] = [0; GF_ORDER];
static mut EXP_TABLE: [u8; GF_ORDER * 2 - 2] = [0; GF_ORDER * 2 - 2];
static mut INV_TABLE: [u8; GF_ORDER] = [0; GF_ORDER];
static mut MUL_TABLE: [[u8; GF_ORDER]; GF_ORDER] = [[0; GF_ORDER]; GF_ORDER];

static INIT: Once = Once::new();

/// Builds the exp/log/inverse/multiplication tables. Idempotent and safe to
/// call from any thread; only the first call does any work.
pub fn init() {
    INIT.call_once(|| unsafe {
        EXP_TABLE[0] = 1;
        for i in 1..255usize {
            let prev = EXP_TABLE[i - 1] as u16;
            let mut cur = prev << 1;
            if prev & 0x80 != 0 {
                cur ^= IRREDUCIBLE_POLY;
            }
            EXP_TABLE[i] = cur as u8;
            LOG_TABLE[cur as u8 as usize] = i as u8;
        }
        LOG_TABLE[1] = 0;
        for i in 0..255usize {
            EXP_TABLE[i + 255] = EXP_TABLE[i];
        }
        for i in 1..255usize {
            INV_TABLE[EXP_TABLE[i] as usize] = EXP_TABLE[255 - i];
        }
        INV_TABLE[1] = 1;

        for a in 1..GF_ORDER {
            for b in 1..GF_ORDER {
                let sum = LOG_TABLE[a] as usize + LOG_TABLE[b] as usize;
                MUL_TABLE[a][b] = EXP_TABLE[sum];
            }
        }
    });
}

#[inline(always)]
fn tables_ready() {
    debug_assert!(
        INIT.is_completed(),
        "field::init() must be called before using GF(2^8) operations"
    );
}

/// `a * b` in GF(2^8).
#[inline(always)]
pub fn mul(a: u8, b: u8) -> u8 {
    tables_ready();
    unsafe { MUL_TABLE[a as usize][b as usize] }
}

/// `a / b` in GF(2^8). Undefined (returns garbage) for `b == 0`.
#[inline(always)]
pub fn div(a: u8, b: u8) -> u8 {
    mul(a, inv(b))
}

/// Multiplicative inverse of `a`. Undefined for `a == 0`.
#[inline(always)]
pub fn inv(a: u8) -> u8 {
    tables_ready();
    unsafe { INV_TABLE[a as usize] }
}

/// `x^i` for the field's generator `x = 2`.
#[inline(always)]
pub fn exp_x(i: u8) -> u8 {
    tables_ready();
    unsafe { EXP_TABLE[i as usize] }
}

/// `log_x(a)`, the discrete log of `a` base the generator. Undefined for `a == 0`.
#[inline(always)]
pub fn log_x(a: u8) -> u8 {
    tables_ready();
    unsafe { LOG_TABLE[a as usize] }
}

#[inline(always)]
fn mul_row(b: u8) -> &'static [u8; GF_ORDER] {
    tables_ready();
    unsafe { &MUL_TABLE[b as usize] }
}

/// `dst[i] = src[i] * b` for `i in 0..len`. `src` and `dst` may alias.
pub fn mul_bytes(src: &[u8], b: u8, dst: &mut [u8]) {
    assert_eq!(src.len(), dst.len());
    optimize::dispatch(|_policy: &dyn SimdPolicy| {
        mul_bytes_scalar(src, b, dst);
    });
}

/// `dst[i] ^= src[i] * b` for `i in 0..len`. `src` and `dst` may alias.
pub fn mulxor_bytes(src: &[u8], b: u8, dst: &mut [u8]) {
    assert_eq!(src.len(), dst.len());
    optimize::dispatch(|_policy: &dyn SimdPolicy| {
        mulxor_bytes_scalar(src, b, dst);
    });
}

// Both batched operations process 8 symbols per iteration, mirroring the
// reference library's use of a packed 64-bit word to cut down on loop
// overhead; the remaining tail is handled byte-wise.
fn mul_bytes_scalar(src: &[u8], b: u8, dst: &mut [u8]) {
    let table = mul_row(b);
    let len = src.len();
    let chunks = len / 8;
    for c in 0..chunks {
        let base = c * 8;
        for i in 0..8 {
            dst[base + i] = table[src[base + i] as usize];
        }
    }
    for i in chunks * 8..len {
        dst[i] = table[src[i] as usize];
    }
}

fn mulxor_bytes_scalar(src: &[u8], b: u8, dst: &mut [u8]) {
    let table = mul_row(b);
    let len = src.len();
    let chunks = len / 8;
    for c in 0..chunks {
        let base = c * 8;
        for i in 0..8 {
            dst[base + i] ^= table[src[base + i] as usize];
        }
    }
    for i in chunks * 8..len {
        dst[i] ^= table[src[i] as usize];
    }
}
