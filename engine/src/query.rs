//! Read-side types for the administrative console.
//!
//! Queries never lock rows for the duration of a listing; they work on
//! point-in-time snapshots and cannot observe a half-applied mutation.

use crate::activity::ActivityRecord;
use crate::transfer::{TransferRecord, TransferStatus};
use custodia_common::{AdminId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Page request with offset/limit semantics.
///
/// A zero limit means "use the engine default"; limits above the configured
/// maximum are clamped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Rows to skip.
    pub offset: usize,
    /// Rows to return.
    pub limit: usize,
}

impl PageRequest {
    /// Create a page request.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// First page with the given size.
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Rows in this page.
    pub items: Vec<T>,
    /// Rows matching the filter before paging.
    pub total: usize,
    /// Offset this page starts at.
    pub offset: usize,
}

impl<T> Page<T> {
    /// Check if no further pages exist.
    pub fn is_last(&self) -> bool {
        self.offset + self.items.len() >= self.total
    }
}

/// Filter for transfer ledger queries. Conditions are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    /// Match transfers where the user is source or destination.
    pub user: Option<UserId>,
    /// Match a single lifecycle state.
    pub status: Option<TransferStatus>,
    /// Inclusive lower bound on creation time.
    pub after: Option<Timestamp>,
    /// Inclusive upper bound on creation time.
    pub before: Option<Timestamp>,
}

impl TransferFilter {
    /// Check a record against the filter.
    pub fn matches(&self, record: &TransferRecord) -> bool {
        if let Some(user) = &self.user {
            if !record.involves(user) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(after) = self.after {
            if record.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if record.created_at > before {
                return false;
            }
        }
        true
    }
}

/// Filter for activity log queries. Conditions are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Match records written by this administrator.
    pub admin: Option<AdminId>,
    /// Match records targeting this account.
    pub target: Option<UserId>,
}

impl ActivityFilter {
    /// Check a record against the filter.
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        if let Some(admin) = &self.admin {
            if &record.admin != admin {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if record.target.as_ref() != Some(target) {
                return false;
            }
        }
        true
    }
}

/// Cut one page out of pre-filtered, pre-sorted rows.
pub(crate) fn paginate<T>(
    mut items: Vec<T>,
    page: PageRequest,
    default_limit: usize,
    max_limit: usize,
) -> Page<T> {
    let total = items.len();
    let limit = if page.limit == 0 {
        default_limit
    } else {
        page.limit.min(max_limit)
    };
    let offset = page.offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    let items = items.drain(offset..end).collect();

    Page {
        items,
        total,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_common::Currency;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn create_test_transfer(from: &str, to: &str) -> TransferRecord {
        TransferRecord::completed(
            UserId::new(from),
            UserId::new(to),
            Decimal::from_str("5.00").unwrap(),
            Currency::usd(),
            None,
        )
    }

    #[test]
    fn test_paginate_with_default_limit() {
        let rows: Vec<u32> = (0..120).collect();
        let page = paginate(rows, PageRequest::default(), 50, 500);

        assert_eq!(page.items.len(), 50);
        assert_eq!(page.total, 120);
        assert_eq!(page.offset, 0);
        assert!(!page.is_last());
    }

    #[test]
    fn test_paginate_clamps_limit_and_offset() {
        let rows: Vec<u32> = (0..10).collect();

        let oversized = paginate(rows.clone(), PageRequest::first(10_000), 50, 500);
        assert_eq!(oversized.items.len(), 10);

        let past_the_end = paginate(rows, PageRequest::new(50, 5), 50, 500);
        assert!(past_the_end.items.is_empty());
        assert_eq!(past_the_end.total, 10);
        assert!(past_the_end.is_last());
    }

    #[test]
    fn test_paginate_middle_page() {
        let rows: Vec<u32> = (0..10).collect();
        let page = paginate(rows, PageRequest::new(4, 3), 50, 500);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.offset, 4);
    }

    #[test]
    fn test_transfer_filter_by_user_matches_either_endpoint() {
        let record = create_test_transfer("alice", "bob");

        let mut filter = TransferFilter::default();
        filter.user = Some(UserId::new("bob"));
        assert!(filter.matches(&record));

        filter.user = Some(UserId::new("carol"));
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_transfer_filter_date_window() {
        let record = create_test_transfer("alice", "bob");

        let mut filter = TransferFilter::default();
        filter.after = Some(record.created_at - chrono::Duration::minutes(1));
        filter.before = Some(record.created_at + chrono::Duration::minutes(1));
        assert!(filter.matches(&record));

        filter.after = Some(record.created_at + chrono::Duration::minutes(1));
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_activity_filter_is_conjunctive() {
        let record = crate::activity::ActivityRecord::frozen_change(
            &AdminId::new("ops-1"),
            &UserId::new("alice"),
            true,
        );

        let filter = ActivityFilter {
            admin: Some(AdminId::new("ops-1")),
            target: Some(UserId::new("alice")),
        };
        assert!(filter.matches(&record));

        let filter = ActivityFilter {
            admin: Some(AdminId::new("ops-1")),
            target: Some(UserId::new("bob")),
        };
        assert!(!filter.matches(&record));
    }
}
