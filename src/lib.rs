//! FMSR (Functional Minimum-Storage Regenerating) erasure coding core.
//!
//! Three layers, leaves first: GF(2^8) field arithmetic ([`field`]), dense
//! matrix operations over that field ([`matrix`]), and the FMSR encode /
//! decode / repair algorithms built on top ([`fmsr`]).

pub mod config;
pub mod error;
pub mod field;
pub mod fmsr;
pub mod matrix;
pub mod optimize;

pub use config::{FmsrConfig, RepairChecks};
pub use error::FmsrError;
pub use fmsr::{RepairHints, RepairOutcome};
