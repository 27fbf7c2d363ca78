use std::collections::HashMap;
use std::hash::Hash;

use adhist_types::OverflowDirection;

use crate::io::FeatureValue;

/// Direction of a future-counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Fold a row into the future view.
    Plus,
    /// Retract a row from the future view.
    Minus,
}

impl Sign {
    /// `1.0` or `-1.0`.
    #[must_use]
    pub const fn as_f32(self) -> f32 {
        match self {
            Self::Plus => 1.0,
            Self::Minus => -1.0,
        }
    }

    const fn bound(self) -> OverflowDirection {
        match self {
            Self::Plus => OverflowDirection::Positive,
            Self::Minus => OverflowDirection::Negative,
        }
    }
}

/// A fixed-width integer usable as an exact counter.
///
/// All arithmetic is checked; reaching a bound is reported instead of wrapping.
pub trait CounterValue: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Largest representable value.
    const MAX: Self;
    /// Smallest representable value.
    const MIN: Self;

    /// Add one, or `None` at `MAX`.
    fn checked_inc(self) -> Option<Self>;
    /// Subtract one, or `None` at `MIN`.
    fn checked_dec(self) -> Option<Self>;
    /// Output representation of the value.
    fn to_value(self) -> FeatureValue;

    /// Step in the direction of `sign`.
    fn checked_step(self, sign: Sign) -> Option<Self> {
        match sign {
            Sign::Plus => self.checked_inc(),
            Sign::Minus => self.checked_dec(),
        }
    }
}

macro_rules! impl_counter_value {
    ($($t:ty => $variant:ident as $wide:ty),* $(,)?) => {
        $(
            impl CounterValue for $t {
                const MAX: Self = <$t>::MAX;
                const MIN: Self = <$t>::MIN;

                fn checked_inc(self) -> Option<Self> {
                    self.checked_add(1)
                }

                fn checked_dec(self) -> Option<Self> {
                    self.checked_sub(1)
                }

                fn to_value(self) -> FeatureValue {
                    FeatureValue::$variant(<$wide>::from(self))
                }
            }
        )*
    };
}

impl_counter_value! {
    u8 => Unsigned as u64,
    u16 => Unsigned as u64,
    u32 => Unsigned as u64,
    u64 => Unsigned as u64,
    i32 => Signed as i64,
    i64 => Signed as i64,
}

/// One counter bucket: past and future views, each with total and positive counts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counts<C> {
    /// Rows committed from earlier events.
    pub past: C,
    /// Clicked rows committed from earlier events.
    pub past_pos: C,
    /// Rows of events not yet committed, net of retractions.
    pub future: C,
    /// Clicked rows of events not yet committed, net of retractions.
    pub future_pos: C,
}

impl<C: CounterValue> Counts<C> {
    /// The bucket after committing one row to the past.
    ///
    /// # Errors
    /// Returns `OverflowDirection::Positive` if `past` is already at `C::MAX`;
    /// `self` is left untouched so callers can validate several buckets before
    /// storing any of them.
    pub fn increment_past(self, clicked: bool) -> Result<Self, OverflowDirection> {
        let past = self.past.checked_inc().ok_or(OverflowDirection::Positive)?;
        let past_pos = if clicked {
            self.past_pos
                .checked_inc()
                .ok_or(OverflowDirection::Positive)?
        } else {
            self.past_pos
        };
        Ok(Self {
            past,
            past_pos,
            ..self
        })
    }

    /// The bucket after adding (`Plus`) or retracting (`Minus`) one future row.
    ///
    /// # Errors
    /// Returns the bound that would have been crossed by `future` or, for
    /// clicked rows, by `future_pos`.
    pub fn apply_future(self, sign: Sign, clicked: bool) -> Result<Self, OverflowDirection> {
        let future = self.future.checked_step(sign).ok_or(sign.bound())?;
        let future_pos = if clicked {
            self.future_pos.checked_step(sign).ok_or(sign.bound())?
        } else {
            self.future_pos
        };
        Ok(Self {
            future,
            future_pos,
            ..self
        })
    }

    /// The four fields in output order: past, past clicks, future, future clicks.
    #[must_use]
    pub fn values(&self) -> [FeatureValue; 4] {
        [
            self.past.to_value(),
            self.past_pos.to_value(),
            self.future.to_value(),
            self.future_pos.to_value(),
        ]
    }
}

impl Counts<f32> {
    /// Commit one row to the past with the given annotation confidence.
    pub fn add_past_weighted(&mut self, weight: f32, clicked: bool) {
        self.past += weight;
        if clicked {
            self.past_pos += weight;
        }
    }

    /// Add or retract one future row with the given annotation confidence.
    pub fn add_future_weighted(&mut self, weight: f32, sign: Sign, clicked: bool) {
        let delta = weight * sign.as_f32();
        self.future += delta;
        if clicked {
            self.future_pos += delta;
        }
    }
}

/// Lazily populated map from a key to its counter bucket.
///
/// Absent keys read as an all-zero bucket; reads never insert.
#[derive(Debug, Clone)]
pub struct CounterStore<K, C> {
    label: &'static str,
    buckets: HashMap<K, Counts<C>>,
}

impl<K: Eq + Hash, C: Copy + Default> CounterStore<K, C> {
    /// Empty store; `label` names the dimension in overflow errors.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            buckets: HashMap::new(),
        }
    }

    /// Dimension label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Snapshot of the bucket for `key`.
    pub fn get(&self, key: &K) -> Counts<C> {
        self.buckets.get(key).copied().unwrap_or_default()
    }

    /// Replace the bucket for `key`.
    pub fn set(&mut self, key: K, counts: Counts<C>) {
        self.buckets.insert(key, counts);
    }

    /// Mutable access to the bucket for `key`, created at zero if absent.
    pub fn entry(&mut self, key: K) -> &mut Counts<C> {
        self.buckets.entry(key).or_default()
    }

    /// Number of materialized buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no bucket has been touched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_saturates_at_max() {
        let c = Counts::<u8> {
            past: u8::MAX - 1,
            ..Counts::default()
        };
        let c = c.increment_past(false).unwrap();
        assert_eq!(c.past, u8::MAX);
        assert_eq!(c.increment_past(false), Err(OverflowDirection::Positive));
    }

    #[test]
    fn future_retract_below_zero_is_negative_overflow() {
        let c = Counts::<u16>::default();
        assert_eq!(
            c.apply_future(Sign::Minus, false),
            Err(OverflowDirection::Negative)
        );
    }

    #[test]
    fn signed_counters_go_negative_until_min() {
        let c = Counts::<i32>::default()
            .apply_future(Sign::Minus, true)
            .unwrap();
        assert_eq!(c.future, -1);
        assert_eq!(c.future_pos, -1);

        let at_min = Counts::<i32> {
            future: i32::MIN,
            ..Counts::default()
        };
        assert_eq!(
            at_min.apply_future(Sign::Minus, false),
            Err(OverflowDirection::Negative)
        );
    }

    #[test]
    fn clicked_only_moves_positive_fields() {
        let c = Counts::<u32>::default()
            .increment_past(true)
            .unwrap()
            .increment_past(false)
            .unwrap()
            .apply_future(Sign::Plus, true)
            .unwrap();
        assert_eq!((c.past, c.past_pos, c.future, c.future_pos), (2, 1, 1, 1));
    }

    #[test]
    fn weighted_future_roundtrip_returns_to_zero() {
        let mut c = Counts::<f32>::default();
        c.add_future_weighted(0.25, Sign::Plus, true);
        c.add_future_weighted(0.25, Sign::Minus, true);
        assert_eq!(c.future, 0.0);
        assert_eq!(c.future_pos, 0.0);
    }

    #[test]
    fn store_reads_do_not_materialize_buckets() {
        let store: CounterStore<(u32, u32), u8> = CounterStore::new("ad");
        assert_eq!(store.get(&(1, 2)), Counts::default());
        assert!(store.is_empty());
    }
}
