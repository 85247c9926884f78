//! ## Relative-error quantile sketch
//!
//! [`QuantileSketch`] estimates quantiles of a stream of `f64` values with a deterministic
//! relative error bound. Values are counted in logarithmically sized buckets: with relative
//! accuracy `alpha`, bucket `k` holds the values in `(gamma^(k-1), gamma^k]` where
//! `gamma = (1 + alpha) / (1 - alpha)`, and every value of the bucket is represented by
//! `2 * gamma^k / (1 + gamma)`.
//!
//! ### Error bound
//!
//! For `n` inserted values sorted as `v[0] <= ... <= v[n-1]`, the estimate of quantile `q` is
//! computed for the order statistic `x = v[floor(q * (n - 1))]` and satisfies
//! `|estimate - x| <= alpha * |x|`. The estimate is also clamped into `[min, max]` of the
//! inserted values, which can only bring it closer to `x`.
//!
//! Memory grows with the logarithm of the value range, not with `n`, and two sketches built
//! with the same accuracy merge by adding bucket counts, with the same bound holding for the
//! merged data. Values with magnitude below [`MIN_INDEXABLE`] are counted as zero.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use std::collections::BTreeMap;

/// Smallest magnitude that gets its own bucket; anything closer to zero counts as zero.
pub const MIN_INDEXABLE: f64 = 1e-9;

const HEADER_LEN: usize = 8 + 8 + 8 + 8 + 8;
const BUCKET_LEN: usize = 4 + 8;

#[derive(Debug, Clone, PartialEq)]
pub struct QuantileSketch {
    relative_accuracy: f64,
    gamma: f64,
    ln_gamma: f64,
    positive: BTreeMap<i32, u64>,
    negative: BTreeMap<i32, u64>,
    zero_count: u64,
    count: u64,
    min: f64,
    max: f64,
}

impl QuantileSketch {
    /// Creates an empty sketch whose estimates are within `relative_accuracy` of the exact value.
    pub fn new(relative_accuracy: f64) -> TaxiSummaryResult<Self> {
        if !(relative_accuracy > 0.0 && relative_accuracy < 1.0) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Relative accuracy {} must be strictly between 0 and 1",
                relative_accuracy
            )));
        }
        let gamma = (1.0 + relative_accuracy) / (1.0 - relative_accuracy);
        Ok(Self {
            relative_accuracy,
            gamma,
            ln_gamma: gamma.ln(),
            positive: BTreeMap::new(),
            negative: BTreeMap::new(),
            zero_count: 0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        })
    }

    pub fn relative_accuracy(&self) -> f64 {
        self.relative_accuracy
    }

    /// Number of values inserted (non-finite values are ignored and not counted).
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of non-empty buckets, a proxy for the sketch's memory use.
    pub fn bucket_count(&self) -> usize {
        self.positive.len() + self.negative.len() + usize::from(self.zero_count > 0)
    }

    fn key(&self, magnitude: f64) -> i32 {
        (magnitude.ln() / self.ln_gamma).ceil() as i32
    }

    fn representative(&self, key: i32) -> f64 {
        2.0 * self.gamma.powi(key) / (1.0 + self.gamma)
    }

    pub fn insert(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if value > MIN_INDEXABLE {
            *self.positive.entry(self.key(value)).or_insert(0) += 1;
        } else if value < -MIN_INDEXABLE {
            *self.negative.entry(self.key(-value)).or_insert(0) += 1;
        } else {
            self.zero_count += 1;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Estimates quantile `q` (between 0 and 1). Returns `None` for an empty sketch.
    pub fn quantile(&self, q: f64) -> TaxiSummaryResult<Option<f64>> {
        if !(0.0..=1.0).contains(&q) {
            return Err(TaxiSummaryError::InvalidParameter(format!(
                "Quantile {} must be between 0 and 1",
                q
            )));
        }
        if self.count == 0 {
            return Ok(None);
        }
        let rank = q * (self.count - 1) as f64;
        let mut seen = 0u64;

        // Ascending value order: negatives from the largest magnitude down, zero, positives up.
        for (&key, &n) in self.negative.iter().rev() {
            seen += n;
            if seen as f64 > rank {
                return Ok(Some(self.clamp(-self.representative(key))));
            }
        }
        seen += self.zero_count;
        if self.zero_count > 0 && seen as f64 > rank {
            return Ok(Some(self.clamp(0.0)));
        }
        for (&key, &n) in self.positive.iter() {
            seen += n;
            if seen as f64 > rank {
                return Ok(Some(self.clamp(self.representative(key))));
            }
        }
        Ok(Some(self.max))
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Adds the other sketch's counts to this one. Both must use the same accuracy.
    pub fn merge(&mut self, other: &QuantileSketch) -> TaxiSummaryResult<()> {
        if self.relative_accuracy != other.relative_accuracy {
            return Err(TaxiSummaryError::CorruptSketch(format!(
                "cannot merge sketches with accuracy {} and {}",
                self.relative_accuracy, other.relative_accuracy
            )));
        }
        for (&key, &n) in &other.positive {
            *self.positive.entry(key).or_insert(0) += n;
        }
        for (&key, &n) in &other.negative {
            *self.negative.entry(key).or_insert(0) += n;
        }
        self.zero_count += other.zero_count;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        Ok(())
    }

    /// Serializes the sketch into a little-endian byte layout readable by [`Self::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let buckets = self.positive.len() + self.negative.len();
        let mut out = Vec::with_capacity(HEADER_LEN + 8 + buckets * BUCKET_LEN);
        out.extend_from_slice(&self.relative_accuracy.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.zero_count.to_le_bytes());
        out.extend_from_slice(&self.min.to_le_bytes());
        out.extend_from_slice(&self.max.to_le_bytes());
        for store in [&self.positive, &self.negative] {
            out.extend_from_slice(&(store.len() as u32).to_le_bytes());
            for (&key, &n) in store {
                out.extend_from_slice(&key.to_le_bytes());
                out.extend_from_slice(&n.to_le_bytes());
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> TaxiSummaryResult<Self> {
        let mut reader = ByteReader { bytes, pos: 0 };
        let mut sketch = Self::new(f64::from_le_bytes(reader.take()?))?;
        sketch.count = u64::from_le_bytes(reader.take()?);
        sketch.zero_count = u64::from_le_bytes(reader.take()?);
        sketch.min = f64::from_le_bytes(reader.take()?);
        sketch.max = f64::from_le_bytes(reader.take()?);
        for negative in [false, true] {
            let len = u32::from_le_bytes(reader.take()?) as usize;
            for _ in 0..len {
                let key = i32::from_le_bytes(reader.take()?);
                let n = u64::from_le_bytes(reader.take()?);
                let store = if negative {
                    &mut sketch.negative
                } else {
                    &mut sketch.positive
                };
                store.insert(key, n);
            }
        }
        if reader.pos != bytes.len() {
            return Err(TaxiSummaryError::CorruptSketch(format!(
                "{} trailing bytes",
                bytes.len() - reader.pos
            )));
        }
        let bucketed: u64 = sketch.positive.values().chain(sketch.negative.values()).sum();
        if bucketed + sketch.zero_count != sketch.count {
            return Err(TaxiSummaryError::CorruptSketch(format!(
                "bucket counts sum to {} but count is {}",
                bucketed + sketch.zero_count,
                sketch.count
            )));
        }
        Ok(sketch)
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl ByteReader<'_> {
    fn take<const N: usize>(&mut self) -> TaxiSummaryResult<[u8; N]> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            TaxiSummaryError::CorruptSketch(format!(
                "unexpected end of input at byte {}",
                self.pos
            ))
        })?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }
}
