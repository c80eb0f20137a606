use super::Filter;
use crate::component::media_organizer::file_record::FileRecord;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// 篩選統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub total_files: usize,
    pub included_files: usize,
    pub excluded_files: usize,
    /// 篩選器 id -> 被該篩選器排除的數量
    pub exclusion_by_filter: BTreeMap<String, usize>,
}

impl FilterStats {
    fn add_file(&mut self, included: bool, filter_id: Option<&str>) {
        self.total_files += 1;
        if included {
            self.included_files += 1;
        } else {
            self.excluded_files += 1;
            if let Some(id) = filter_id {
                *self.exclusion_by_filter.entry(id.to_string()).or_insert(0) += 1;
            }
        }
    }

    #[must_use]
    pub fn inclusion_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.included_files as f64 / self.total_files as f64
        }
    }
}

/// 整條篩選鏈對單一檔案的結果
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub include: bool,
    pub reason: Option<String>,
    /// 造成排除的篩選器 id
    pub rejected_by: Option<String>,
    /// 已執行篩選器的 metadata，以篩選器 id 分組
    pub metadata: Map<String, Value>,
}

/// 被排除的檔案與原因
#[derive(Debug, Clone)]
pub struct ExcludedFile {
    pub path: PathBuf,
    pub filter_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveFilter {
    pub id: String,
    pub name: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterChainSummary {
    pub active_filters: Vec<ActiveFilter>,
    pub total_filters: usize,
    pub stats: FilterStats,
    pub inclusion_rate: f64,
}

/// 依優先度排序的篩選鏈
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
    stats: Mutex<FilterStats>,
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入篩選器並維持優先度排序，相同優先度保持加入順序
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
        self.filters.sort_by_key(|f| f.priority());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// 依執行順序排列的篩選器
    pub fn filters(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|f| f.as_ref())
    }

    /// 判斷檔案是否通過，不更新統計
    #[must_use]
    pub fn check(&self, record: &FileRecord) -> FilterOutcome {
        let mut metadata = Map::new();

        for filter in self.filters.iter().filter(|f| f.enabled()) {
            let result = filter.check(record);
            metadata.insert(filter.id().to_string(), Value::Object(result.metadata));

            if !result.include {
                let reason = result
                    .reason
                    .unwrap_or_else(|| format!("Excluded by {}", filter.name()));
                return FilterOutcome {
                    include: false,
                    reason: Some(reason),
                    rejected_by: Some(filter.id().to_string()),
                    metadata,
                };
            }
        }

        FilterOutcome {
            include: true,
            reason: None,
            rejected_by: None,
            metadata,
        }
    }

    /// 判斷檔案是否通過並累計統計
    pub fn evaluate(&self, record: &FileRecord) -> FilterOutcome {
        let outcome = self.check(record);

        if let Some(reason) = &outcome.reason {
            debug!("排除 {}: {reason}", record.display_name());
        }

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_file(outcome.include, outcome.rejected_by.as_deref());

        outcome
    }

    /// 平行評估所有檔案，回傳（通過的紀錄, 被排除的檔案），皆維持原本順序
    pub fn partition(&self, records: Vec<FileRecord>) -> (Vec<FileRecord>, Vec<ExcludedFile>) {
        let evaluated: Vec<(FileRecord, FilterOutcome)> = records
            .into_par_iter()
            .map(|record| {
                let outcome = self.evaluate(&record);
                (record, outcome)
            })
            .collect();

        let mut included = Vec::with_capacity(evaluated.len());
        let mut excluded = Vec::new();
        for (record, outcome) in evaluated {
            if outcome.include {
                included.push(record);
            } else {
                excluded.push(ExcludedFile {
                    path: record.source_path().to_path_buf(),
                    filter_id: outcome.rejected_by.unwrap_or_default(),
                    reason: outcome.reason.unwrap_or_default(),
                });
            }
        }

        (included, excluded)
    }

    #[must_use]
    pub fn stats(&self) -> FilterStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = FilterStats::default();
    }

    #[must_use]
    pub fn summary(&self) -> FilterChainSummary {
        let stats = self.stats();
        let inclusion_rate = stats.inclusion_rate();
        FilterChainSummary {
            active_filters: self
                .filters
                .iter()
                .filter(|f| f.enabled())
                .map(|f| ActiveFilter {
                    id: f.id().to_string(),
                    name: f.name().to_string(),
                    priority: f.priority(),
                })
                .collect(),
            total_filters: self.filters.len(),
            stats,
            inclusion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::media_organizer::filter::FilterResult;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::SystemTime;

    struct StubFilter {
        id: &'static str,
        priority: i32,
        enabled: bool,
        include: bool,
        calls: Arc<AtomicUsize>,
    }

    impl StubFilter {
        fn boxed(id: &'static str, priority: i32, include: bool) -> (Box<dyn Filter>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let filter = Self {
                id,
                priority,
                enabled: true,
                include,
                calls: Arc::clone(&calls),
            };
            (Box::new(filter), calls)
        }
    }

    impl Filter for StubFilter {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn description(&self) -> String {
            String::new()
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn enabled(&self) -> bool {
            self.enabled
        }
        fn check(&self, _record: &FileRecord) -> FilterResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut metadata = Map::new();
            metadata.insert("seen".to_string(), Value::Bool(true));
            if self.include {
                FilterResult::include(metadata)
            } else {
                FilterResult::exclude(format!("rejected by {}", self.id), metadata)
            }
        }
    }

    fn record() -> FileRecord {
        FileRecord::from_parts(Path::new("/src/a.jpg"), 1, SystemTime::UNIX_EPOCH, 0)
    }

    #[test]
    fn test_runs_in_priority_order_and_stops_at_first_rejection() {
        let mut chain = FilterChain::new();
        let (late, late_calls) = StubFilter::boxed("late", 90, true);
        let (reject, _) = StubFilter::boxed("reject", 50, false);
        let (early, early_calls) = StubFilter::boxed("early", 10, true);
        chain.add_filter(late);
        chain.add_filter(reject);
        chain.add_filter(early);

        let outcome = chain.evaluate(&record());

        assert!(!outcome.include);
        assert_eq!(outcome.rejected_by.as_deref(), Some("reject"));
        assert_eq!(outcome.reason.as_deref(), Some("rejected by reject"));
        assert_eq!(early_calls.load(Ordering::SeqCst), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert!(outcome.metadata.contains_key("early"));
        assert!(outcome.metadata.contains_key("reject"));
        assert!(!outcome.metadata.contains_key("late"));
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let mut chain = FilterChain::new();
        let (first, _) = StubFilter::boxed("first", 10, false);
        let (second, second_calls) = StubFilter::boxed("second", 10, false);
        chain.add_filter(first);
        chain.add_filter(second);

        let outcome = chain.evaluate(&record());
        assert_eq!(outcome.rejected_by.as_deref(), Some("first"));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_filter_is_skipped() {
        let mut chain = FilterChain::new();
        let calls = Arc::new(AtomicUsize::new(0));
        chain.add_filter(Box::new(StubFilter {
            id: "off",
            priority: 1,
            enabled: false,
            include: false,
            calls: Arc::clone(&calls),
        }));

        let outcome = chain.evaluate(&record());
        assert!(outcome.include);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.summary().active_filters.len(), 0);
    }

    #[test]
    fn test_stats_accumulate_by_filter() {
        let mut chain = FilterChain::new();
        let (reject, _) = StubFilter::boxed("reject", 10, false);
        chain.add_filter(reject);

        chain.evaluate(&record());
        chain.evaluate(&record());

        let stats = chain.stats();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.excluded_files, 2);
        assert_eq!(stats.exclusion_by_filter.get("reject"), Some(&2));
        assert_eq!(stats.inclusion_rate(), 0.0);

        chain.reset_stats();
        assert_eq!(chain.stats(), FilterStats::default());
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let mut chain = FilterChain::new();
        let (pass, _) = StubFilter::boxed("pass", 10, true);
        chain.add_filter(pass);

        let r = record();
        assert_eq!(chain.evaluate(&r), chain.evaluate(&r));
    }

    #[test]
    fn test_partition_preserves_order() {
        let mut chain = FilterChain::new();
        let (pass, _) = StubFilter::boxed("pass", 10, true);
        chain.add_filter(pass);

        let records: Vec<FileRecord> = (0..50)
            .map(|i| {
                FileRecord::from_parts(
                    Path::new(&format!("/src/{i}.jpg")),
                    1,
                    SystemTime::UNIX_EPOCH,
                    i,
                )
            })
            .collect();

        let (included, excluded) = chain.partition(records);
        assert!(excluded.is_empty());
        let indices: Vec<usize> = included.iter().map(FileRecord::discovery_index).collect();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
    }
}
