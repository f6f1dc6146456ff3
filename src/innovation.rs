//! Innovation ids for connection genes.
//!
//! A connection is identified by the ordered pair of its endpoint indices in
//! the owning network's node sequence. The innovation id is the Cantor pairing
//! of that pair: deterministic for a fixed node ordering, injective, and
//! order-sensitive, so `(from, to)` and `(to, from)` never collide.
//!
//! Ids are only comparable between networks whose indices were assigned by
//! the same layout (inputs, outputs, hidden), which is what crossover relies on.

/// Compute the innovation id of a connection from `from` to `to`.
#[inline]
#[must_use]
pub const fn connection_innovation(from: usize, to: usize) -> u64 {
    let a = from as u64;
    let b = to as u64;
    (a + b) * (a + b + 1) / 2 + b
}

/// Recover the `(from, to)` index pair from an innovation id.
#[must_use]
pub fn innovation_endpoints(innovation: u64) -> (usize, usize) {
    // w = floor((sqrt(8z + 1) - 1) / 2), corrected for float rounding.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut w = ((((8 * innovation + 1) as f64).sqrt() - 1.0) / 2.0) as u64;
    while w * (w + 1) / 2 > innovation {
        w -= 1;
    }
    while (w + 1) * (w + 2) / 2 <= innovation {
        w += 1;
    }
    let b = innovation - w * (w + 1) / 2;
    let a = w - b;
    #[allow(clippy::cast_possible_truncation)]
    (a as usize, b as usize)
}
