use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::area::{self, AreaHealth, CriticalArea};
use super::domain::{Category, Coordinates, Issue, IssueId, IssueStatus, Level};
use super::rules::{
    merge_priority, priority_from_count, priority_from_keywords, priority_from_time,
    trust_from_supporters,
};

/// Two reports are near-duplicates when both axes differ by strictly less
/// than this many degrees (roughly 200m).
pub const NEAR_DUPLICATE_THRESHOLD_DEG: f64 = 0.002;

/// How the duplicate scan treats issues that were already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvedMatchPolicy {
    /// Resolved issues are skipped; a fresh report opens a new issue.
    #[default]
    OpenNew,
    /// Resolved issues still absorb duplicates (count, priority, trust) but
    /// keep their resolved status.
    Absorb,
}

impl ResolvedMatchPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenNew => "open-new",
            Self::Absorb => "absorb",
        }
    }

    fn considers(self, issue: &Issue) -> bool {
        match self {
            Self::OpenNew => issue.is_open(),
            Self::Absorb => true,
        }
    }
}

impl FromStr for ResolvedMatchPolicy {
    type Err = UnknownPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open-new" | "open_new" | "new" => Ok(Self::OpenNew),
            "absorb" => Ok(Self::Absorb),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ResolvedMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resolved-match policy '{0}' (expected open-new or absorb)")]
pub struct UnknownPolicy(pub String);

/// Result of filing a report against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub issue: Issue,
    pub duplicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssueStats {
    pub total_issues: usize,
    pub open_issues: usize,
    pub resolved_issues: usize,
    pub high_priority_issues: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("issue {0} not found")]
    NotFound(IssueId),
}

#[derive(Debug)]
struct StoreState {
    issues: HashMap<IssueId, Issue>,
    order: Vec<IssueId>,
    next_id: u64,
}

impl StoreState {
    fn ordered(&self) -> impl Iterator<Item = &Issue> + '_ {
        self.order.iter().filter_map(|id| self.issues.get(id))
    }

    fn allocate_id(&mut self) -> IssueId {
        let id = IssueId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Authoritative in-memory collection of reported issues.
///
/// A single mutex guards the whole state and every operation holds it for
/// its full duration, so the scan-then-mutate in [`IssueStore::submit`] is
/// atomic with respect to concurrent reports.
#[derive(Debug)]
pub struct IssueStore {
    policy: ResolvedMatchPolicy,
    state: Mutex<StoreState>,
}

impl Default for IssueStore {
    fn default() -> Self {
        Self::new(ResolvedMatchPolicy::default())
    }
}

impl IssueStore {
    pub fn new(policy: ResolvedMatchPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(StoreState {
                issues: HashMap::new(),
                order: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn policy(&self) -> ResolvedMatchPolicy {
        self.policy
    }

    // No operation leaves partially-written state, so a poisoned guard is safe to reuse.
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Files a report, merging it into the first near-duplicate of the same
    /// category (insertion order, not closest) or creating a new issue.
    pub fn submit(
        &self,
        category: Category,
        location: Coordinates,
        raw_text: &str,
        now: DateTime<Utc>,
    ) -> Submission {
        let keyword_priority = priority_from_keywords(raw_text);
        let mut state = self.state();

        let matched = state
            .ordered()
            .find(|issue| {
                issue.category == category
                    && self.policy.considers(issue)
                    && is_near(issue, location)
            })
            .map(|issue| issue.id);

        if let Some(id) = matched {
            if let Some(issue) = state.issues.get_mut(&id) {
                issue.supporters = issue.supporters.saturating_add(1);
                let signal = merge_priority(
                    merge_priority(keyword_priority, priority_from_count(issue.supporters)),
                    priority_from_time(issue.created_at, now),
                );
                issue.priority = merge_priority(issue.priority, signal);
                issue.trust_level = trust_from_supporters(issue.supporters);

                debug!(
                    issue_id = %issue.id,
                    supporters = issue.supporters,
                    priority = %issue.priority,
                    "merged duplicate report"
                );
                return Submission {
                    issue: issue.clone(),
                    duplicate: true,
                };
            }
        }

        let id = state.allocate_id();
        let issue = Issue {
            id,
            category,
            lat: location.lat,
            lon: location.lon,
            supporters: 1,
            priority: keyword_priority,
            trust_level: Level::Low,
            status: IssueStatus::Open,
            created_at: now,
        };
        state.issues.insert(id, issue.clone());
        state.order.push(id);

        info!(issue_id = %id, %category, priority = %issue.priority, "opened issue");
        Submission {
            issue,
            duplicate: false,
        }
    }

    /// Marks an issue resolved. Resolving an already resolved issue succeeds
    /// without changing anything.
    pub fn resolve(&self, id: IssueId) -> Result<Issue, ResolveError> {
        let mut state = self.state();
        let issue = state
            .issues
            .get_mut(&id)
            .ok_or(ResolveError::NotFound(id))?;

        if issue.status == IssueStatus::Open {
            issue.status = IssueStatus::Resolved;
            info!(issue_id = %id, "resolved issue");
        }
        Ok(issue.clone())
    }

    pub fn get(&self, id: IssueId) -> Option<Issue> {
        self.state().issues.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every issue in insertion order, regardless of status.
    pub fn list_all(&self) -> Vec<Issue> {
        self.state().ordered().cloned().collect()
    }

    pub fn list_high_priority_open(&self) -> Vec<Issue> {
        self.state()
            .ordered()
            .filter(|issue| issue.priority == Level::High && issue.is_open())
            .cloned()
            .collect()
    }

    /// `high_priority_issues` counts high issues of any status.
    pub fn stats(&self) -> IssueStats {
        let state = self.state();
        let total_issues = state.order.len();
        let (resolved_issues, high_priority_issues) =
            state
                .ordered()
                .fold((0, 0), |(resolved, high), issue| {
                    (
                        resolved + usize::from(issue.status == IssueStatus::Resolved),
                        high + usize::from(issue.priority == Level::High),
                    )
                });

        IssueStats {
            total_issues,
            open_issues: total_issues - resolved_issues,
            resolved_issues,
            high_priority_issues,
        }
    }

    pub fn critical_areas(&self) -> Vec<CriticalArea> {
        area::critical_areas(self.state().ordered())
    }

    /// Read-and-escalate: re-merges every open issue's priority with its
    /// age-derived priority as of `now`, then reports health per area bucket.
    /// This mutates stored issues; it is not a pure getter.
    pub fn escalate_and_report_area_health(&self, now: DateTime<Utc>) -> Vec<AreaHealth> {
        let mut state = self.state();

        let mut escalated = 0usize;
        for issue in state.issues.values_mut().filter(|issue| issue.is_open()) {
            let next = merge_priority(issue.priority, priority_from_time(issue.created_at, now));
            if next != issue.priority {
                issue.priority = next;
                escalated += 1;
            }
        }
        if escalated > 0 {
            info!(escalated, "escalated aging open issues");
        }

        area::area_health(state.ordered())
    }
}

fn is_near(issue: &Issue, location: Coordinates) -> bool {
    (issue.lat - location.lat).abs() < NEAR_DUPLICATE_THRESHOLD_DEG
        && (issue.lon - location.lon).abs() < NEAR_DUPLICATE_THRESHOLD_DEG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::area::HealthColor;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).expect("finite coordinates")
    }

    #[test]
    fn first_report_opens_low_trust_issue() {
        let store = IssueStore::default();
        let submission = store.submit(Category::Waste, at(28.61, 77.2), "litter", now());

        assert!(!submission.duplicate);
        assert_eq!(submission.issue.supporters, 1);
        assert_eq!(submission.issue.trust_level, Level::Low);
        assert_eq!(submission.issue.priority, Level::Low);
        assert_eq!(submission.issue.status, IssueStatus::Open);
        assert_eq!(submission.issue.created_at, now());
    }

    #[test]
    fn nearby_report_of_same_category_is_merged() {
        let store = IssueStore::default();
        let first = store.submit(Category::Energy, at(28.61, 77.2), "spark near transformer", now());
        assert_eq!(first.issue.priority, Level::High);

        let second = store.submit(
            Category::Energy,
            at(28.6115, 77.2015),
            "spark near transformer",
            now(),
        );
        assert!(second.duplicate);
        assert_eq!(second.issue.id, first.issue.id);
        assert_eq!(second.issue.supporters, 2);
        assert_eq!(second.issue.priority, Level::High);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_without_keywords_never_downgrades_priority() {
        let store = IssueStore::default();
        store.submit(Category::Energy, at(10.0, 10.0), "exposed wire on pole", now());
        let merged = store.submit(Category::Energy, at(10.0, 10.0), "please check", now());

        assert!(merged.duplicate);
        assert_eq!(merged.issue.priority, Level::High);
    }

    #[test]
    fn threshold_is_strict_on_either_axis() {
        let store = IssueStore::default();
        store.submit(Category::Water, at(10.0, 10.0), "tap dry", now());

        let lat_apart = store.submit(Category::Water, at(10.0025, 10.0), "tap dry", now());
        let lon_apart = store.submit(Category::Water, at(10.0, 9.9975), "tap dry", now());

        assert!(!lat_apart.duplicate);
        assert!(!lon_apart.duplicate);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn gap_just_under_threshold_merges() {
        let store = IssueStore::default();
        let first = store.submit(Category::Water, at(10.0, 10.0), "tap dry", now());

        let merged = store.submit(Category::Water, at(10.0019, 9.9981), "tap dry", now());
        assert!(merged.duplicate);
        assert_eq!(merged.issue.id, first.issue.id);
        assert_eq!(merged.issue.supporters, 2);
    }

    #[test]
    fn decimal_threshold_gap_depends_on_float_rounding() {
        // A written 0.002 gap is compared after f64 subtraction:
        // 28.612 - 28.61 lands just under 0.002, 10.002 - 10.0 just over.
        let store = IssueStore::default();
        store.submit(Category::Waste, at(28.61, 77.2), "litter", now());
        store.submit(Category::Air, at(10.0, 10.0), "smoke", now());

        let under = store.submit(Category::Waste, at(28.612, 77.2), "litter", now());
        let over = store.submit(Category::Air, at(10.002, 10.0), "smoke", now());

        assert!(under.duplicate);
        assert!(!over.duplicate);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn different_category_at_same_spot_is_distinct() {
        let store = IssueStore::default();
        store.submit(Category::Water, at(10.0, 10.0), "leak", now());
        let other = store.submit(Category::Noise, at(10.0, 10.0), "loud music", now());
        assert!(!other.duplicate);
    }

    #[test]
    fn first_inserted_match_wins_over_closest() {
        let store = IssueStore::default();
        let first = store.submit(Category::Waste, at(10.0, 10.0), "garbage", now());
        let second = store.submit(Category::Waste, at(10.003, 10.0), "garbage", now());
        assert!(!second.duplicate);

        // Within range of both, closer to the second.
        let merged = store.submit(Category::Waste, at(10.0019, 10.0), "garbage", now());
        assert!(merged.duplicate);
        assert_eq!(merged.issue.id, first.issue.id);
    }

    #[test]
    fn supporter_count_drives_priority_and_trust() {
        let store = IssueStore::default();
        let mut last = store.submit(Category::Noise, at(1.0, 1.0), "loud", now());
        for _ in 0..2 {
            last = store.submit(Category::Noise, at(1.0, 1.0), "loud", now());
        }
        assert_eq!(last.issue.supporters, 3);
        assert_eq!(last.issue.priority, Level::Medium);
        assert_eq!(last.issue.trust_level, Level::Medium);

        for _ in 0..2 {
            last = store.submit(Category::Noise, at(1.0, 1.0), "loud", now());
        }
        assert_eq!(last.issue.supporters, 5);
        assert_eq!(last.issue.priority, Level::High);
        assert_eq!(last.issue.trust_level, Level::High);
        assert_eq!(store.get(last.issue.id), Some(last.issue));
    }

    #[test]
    fn duplicate_uses_original_creation_time_for_age() {
        let store = IssueStore::default();
        let created = now() - Duration::days(4);
        store.submit(Category::Air, at(5.0, 5.0), "haze", created);

        let merged = store.submit(Category::Air, at(5.0, 5.0), "haze", now());
        assert_eq!(merged.issue.created_at, created);
        assert_eq!(merged.issue.priority, Level::Medium);
    }

    #[test]
    fn identifiers_are_unique_and_monotonic() {
        let store = IssueStore::default();
        let ids: Vec<IssueId> = (0..5)
            .map(|step| {
                store
                    .submit(Category::Waste, at(step as f64, 0.0), "bin", now())
                    .issue
                    .id
            })
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn resolve_reports_unknown_ids() {
        let store = IssueStore::default();
        store.submit(Category::Waste, at(1.0, 1.0), "bin", now());
        let before = store.list_all();

        assert_eq!(
            store.resolve(IssueId(999)),
            Err(ResolveError::NotFound(IssueId(999)))
        );
        assert_eq!(store.list_all(), before);
    }

    #[test]
    fn resolve_is_reflected_in_stats_and_is_repeatable() {
        let store = IssueStore::default();
        let issue = store
            .submit(Category::Energy, at(1.0, 1.0), "fire in panel", now())
            .issue;
        store.submit(Category::Waste, at(2.0, 2.0), "bin", now());

        let before = store.stats();
        assert_eq!(before.open_issues, 2);
        assert_eq!(before.resolved_issues, 0);

        let resolved = store.resolve(issue.id).expect("known id");
        assert_eq!(resolved.status, IssueStatus::Resolved);
        store.resolve(issue.id).expect("resolving twice succeeds");

        let after = store.stats();
        assert_eq!(
            after,
            IssueStats {
                total_issues: 2,
                open_issues: 1,
                resolved_issues: 1,
                high_priority_issues: 1,
            }
        );
        assert!(store.list_high_priority_open().is_empty());
    }

    #[test]
    fn list_views_keep_insertion_order() {
        let store = IssueStore::default();
        let a = store.submit(Category::Energy, at(1.0, 1.0), "spark", now()).issue;
        let b = store.submit(Category::Waste, at(2.0, 2.0), "bin", now()).issue;
        let c = store.submit(Category::Water, at(3.0, 3.0), "gas leak", now()).issue;

        let all: Vec<IssueId> = store.list_all().iter().map(|issue| issue.id).collect();
        assert_eq!(all, vec![a.id, b.id, c.id]);

        let high: Vec<IssueId> = store
            .list_high_priority_open()
            .iter()
            .map(|issue| issue.id)
            .collect();
        assert_eq!(high, vec![a.id, c.id]);
    }

    #[test]
    fn open_new_policy_skips_resolved_matches() {
        let store = IssueStore::new(ResolvedMatchPolicy::OpenNew);
        let first = store.submit(Category::Waste, at(1.0, 1.0), "bin", now()).issue;
        store.resolve(first.id).expect("known id");

        let next = store.submit(Category::Waste, at(1.0, 1.0), "bin", now());
        assert!(!next.duplicate);
        assert_ne!(next.issue.id, first.id);
        assert_eq!(store.get(first.id).map(|issue| issue.supporters), Some(1));
    }

    #[test]
    fn absorb_policy_updates_resolved_issue_without_reopening() {
        let store = IssueStore::new(ResolvedMatchPolicy::Absorb);
        let first = store.submit(Category::Waste, at(1.0, 1.0), "bin", now()).issue;
        store.resolve(first.id).expect("known id");

        let next = store.submit(Category::Waste, at(1.0, 1.0), "bin", now());
        assert!(next.duplicate);
        assert_eq!(next.issue.id, first.id);
        assert_eq!(next.issue.supporters, 2);
        assert_eq!(next.issue.status, IssueStatus::Resolved);
    }

    #[test]
    fn area_health_escalates_only_open_issues() {
        let store = IssueStore::default();
        let created = now() - Duration::days(7);
        let open = store.submit(Category::Waste, at(1.0, 1.0), "bin", created).issue;
        let closed = store.submit(Category::Water, at(1.0, 1.0), "tap", created).issue;
        store.resolve(closed.id).expect("known id");

        let rows = store.escalate_and_report_area_health(now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].area, "1.0_1.0");
        assert_eq!(rows[0].health_score, 50);
        assert_eq!(rows[0].color, HealthColor::Yellow);

        assert_eq!(store.get(open.id).map(|issue| issue.priority), Some(Level::High));
        assert_eq!(store.get(closed.id).map(|issue| issue.priority), Some(Level::Low));
        assert_eq!(store.list_high_priority_open().len(), 1);
    }

    #[test]
    fn critical_areas_reflect_resolutions() {
        let store = IssueStore::default();
        let a = store.submit(Category::Waste, at(1.0, 1.0), "bin", now()).issue;
        store.submit(Category::Water, at(1.0, 1.0), "tap", now());
        assert_eq!(store.critical_areas().len(), 1);

        store.resolve(a.id).expect("known id");
        assert!(store.critical_areas().is_empty());
    }

    #[test]
    fn parses_policy_labels() {
        assert_eq!(
            "absorb".parse::<ResolvedMatchPolicy>(),
            Ok(ResolvedMatchPolicy::Absorb)
        );
        assert_eq!(
            " Open-New ".parse::<ResolvedMatchPolicy>(),
            Ok(ResolvedMatchPolicy::OpenNew)
        );
        assert!("reopen".parse::<ResolvedMatchPolicy>().is_err());
    }

    #[test]
    fn concurrent_duplicates_collapse_into_one_issue() {
        let store = Arc::new(IssueStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.submit(Category::Sanitation, at(3.0, 3.0), "blocked drain", now())
                })
            })
            .collect();

        let duplicates = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .filter(|submission| submission.duplicate)
            .count();

        assert_eq!(duplicates, 7);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list_all()[0].supporters, 8);
    }
}
