use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use adhist_types::{AdhistError, ContextBucketConfig, Event, GroupKey, Grouping};
use chrono::TimeDelta;

/// Maps an event to the partition key all counter lookups are scoped to.
pub trait GroupExtractor: Send + Sync {
    /// Which grouping this extractor implements.
    fn grouping(&self) -> Grouping;

    /// Partition key of `event`.
    ///
    /// # Errors
    /// Implementations with bounded key spaces fail when the space is exhausted.
    fn group_key(&self, event: &Event) -> Result<GroupKey, AdhistError>;
}

/// Groups by the event's user id.
#[derive(Debug, Clone, Copy, Default)]
pub struct UidExtractor;

impl GroupExtractor for UidExtractor {
    fn grouping(&self) -> Grouping {
        Grouping::Uid
    }

    fn group_key(&self, event: &Event) -> Result<GroupKey, AdhistError> {
        Ok(event.uid)
    }
}

/// Dense id assignment for (context code, location prefix) composites.
///
/// Cloning yields another handle to the same table, so every extractor built
/// from one table agrees on ids for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ContextTable {
    ids: Arc<Mutex<ContextIds>>,
}

/// Ids keyed by context code, then location prefix, so hits look up by `&str`.
#[derive(Debug, Default)]
struct ContextIds {
    by_code: HashMap<i64, HashMap<String, GroupKey>>,
    assigned: usize,
}

impl ContextTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the composite, assigning the next free id on first sight.
    ///
    /// # Errors
    /// Returns `Other` once more composites than `GroupKey` can address were seen.
    pub fn resolve(&self, code: i64, location_prefix: &str) -> Result<GroupKey, AdhistError> {
        let mut guard = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        let ContextIds { by_code, assigned } = &mut *guard;
        let prefixes = by_code.entry(code).or_default();
        if let Some(id) = prefixes.get(location_prefix) {
            return Ok(*id);
        }
        let next = GroupKey::try_from(*assigned)
            .map_err(|_| AdhistError::Other("context table exhausted".into()))?;
        prefixes.insert(location_prefix.to_owned(), next);
        *assigned += 1;
        Ok(next)
    }

    /// Number of assigned ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .assigned
    }

    /// Whether no id has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every assignment.
    pub fn clear(&self) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.by_code.clear();
        ids.assigned = 0;
    }
}

/// Groups by time-of-week window, platform, and location prefix.
///
/// The window index is `timestamp / window` wrapped to the weekly cycle; it is
/// folded with the platform into `platform + window_index * 100`, paired with the
/// first `location_prefix` characters of the location, and resolved through the
/// shared [`ContextTable`].
#[derive(Debug, Clone)]
pub struct ContextBucketExtractor {
    window_ms: i64,
    windows_per_week: i64,
    location_prefix: usize,
    table: ContextTable,
}

impl ContextBucketExtractor {
    /// Build an extractor over an injected table.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a zero window width or zero windows per week.
    pub fn new(cfg: ContextBucketConfig, table: ContextTable) -> Result<Self, AdhistError> {
        if cfg.window_hours == 0 || cfg.windows_per_week == 0 {
            return Err(AdhistError::InvalidConfig(
                "context windows must be non-empty".into(),
            ));
        }
        Ok(Self {
            window_ms: TimeDelta::hours(i64::from(cfg.window_hours)).num_milliseconds(),
            windows_per_week: i64::from(cfg.windows_per_week),
            location_prefix: cfg.location_prefix,
            table,
        })
    }

    /// Handle to the assignment table.
    #[must_use]
    pub const fn table(&self) -> &ContextTable {
        &self.table
    }

    /// Combined time-window and platform code of an event.
    #[must_use]
    pub fn context_code(&self, event: &Event) -> i64 {
        let window = event
            .timestamp
            .div_euclid(self.window_ms)
            .rem_euclid(self.windows_per_week);
        i64::from(event.platform) + window * 100
    }

    fn location_prefix<'a>(&self, location: &'a str) -> &'a str {
        match location.char_indices().nth(self.location_prefix) {
            Some((end, _)) => &location[..end],
            None => location,
        }
    }
}

impl GroupExtractor for ContextBucketExtractor {
    fn grouping(&self) -> Grouping {
        Grouping::Context
    }

    fn group_key(&self, event: &Event) -> Result<GroupKey, AdhistError> {
        self.table.resolve(
            self.context_code(event),
            self.location_prefix(&event.location),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    fn event(timestamp: i64, platform: i32, location: &str) -> Event {
        Event {
            event_id: 1,
            uid: 9,
            document_id: 1,
            timestamp,
            platform,
            location: location.to_string(),
        }
    }

    fn extractor(table: &ContextTable) -> ContextBucketExtractor {
        ContextBucketExtractor::new(ContextBucketConfig::default(), table.clone()).unwrap()
    }

    #[test]
    fn uid_extractor_is_identity() {
        assert_eq!(UidExtractor.group_key(&event(0, 1, "US")).unwrap(), 9);
    }

    #[test]
    fn context_code_wraps_weekly() {
        let ex = extractor(&ContextTable::new());
        assert_eq!(ex.context_code(&event(0, 2, "US")), 2);
        assert_eq!(ex.context_code(&event(3 * HOUR_MS, 2, "US")), 102);
        assert_eq!(ex.context_code(&event(7 * 24 * HOUR_MS + 3 * HOUR_MS, 2, "US")), 102);
        assert_eq!(ex.context_code(&event(7 * 24 * HOUR_MS - 1, 1, "US")), 5501);
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let table = ContextTable::new();
        let ex = extractor(&table);
        let a = ex.group_key(&event(0, 1, "US>CA>807")).unwrap();
        let b = ex.group_key(&event(0, 1, "US>NY>501")).unwrap();
        // same 5-char prefix as the first location
        let c = ex.group_key(&event(HOUR_MS, 1, "US>CA>800")).unwrap();
        assert_eq!((a, b, c), (0, 1, 0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn table_is_shared_between_extractors_and_resettable() {
        let table = ContextTable::new();
        let first = extractor(&table);
        let second = extractor(&table);
        assert_eq!(first.group_key(&event(0, 1, "GB")).unwrap(), 0);
        assert_eq!(second.group_key(&event(0, 3, "GB")).unwrap(), 1);
        assert_eq!(second.group_key(&event(0, 1, "GB")).unwrap(), 0);

        table.clear();
        assert!(table.is_empty());
        assert_eq!(second.group_key(&event(0, 3, "GB")).unwrap(), 0);
    }

    #[test]
    fn repeated_lookups_reuse_ids_across_codes() {
        let table = ContextTable::new();
        assert_eq!(table.resolve(101, "US>CA").unwrap(), 0);
        assert_eq!(table.resolve(101, "US>NY").unwrap(), 1);
        assert_eq!(table.resolve(202, "US>CA").unwrap(), 2);
        for _ in 0..3 {
            assert_eq!(table.resolve(101, "US>NY").unwrap(), 1);
            assert_eq!(table.resolve(202, "US>CA").unwrap(), 2);
        }
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn zero_window_is_rejected() {
        let cfg = ContextBucketConfig {
            window_hours: 0,
            ..ContextBucketConfig::default()
        };
        assert!(ContextBucketExtractor::new(cfg, ContextTable::new()).is_err());
    }
}
