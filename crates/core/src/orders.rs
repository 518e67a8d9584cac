//! Order list filtering and summary statistics.
//!
//! The admin order table filters by date range, status and a free-text query.
//! Filtering is a partition: orders that match are listed, the rest are counted
//! so the page can say how many were hidden.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::model::Order;
use crate::types::OrderStatus;

/// Date window applied to an order's creation time (UTC calendar days).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    ThisMonth,
    #[default]
    All,
    /// Inclusive on both ends.
    Custom { from: NaiveDate, to: NaiveDate },
}

impl DateRange {
    /// Presets offered in the filter dropdown.
    pub const PRESETS: [Self; 6] = [
        Self::All,
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last30Days,
        Self::ThisMonth,
    ];

    /// Query-string key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::ThisMonth => "month",
            Self::All => "all",
            Self::Custom { .. } => "custom",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
            Self::ThisMonth => "This month",
            Self::All => "All time",
            Self::Custom { .. } => "Custom",
        }
    }

    /// Build a range from query parameters.
    ///
    /// Unknown keys and incomplete custom ranges fall back to [`DateRange::All`].
    /// A custom range given backwards is swapped.
    #[must_use]
    pub fn from_query(key: Option<&str>, from: Option<&str>, to: Option<&str>) -> Self {
        match key.unwrap_or("all") {
            "today" => Self::Today,
            "yesterday" => Self::Yesterday,
            "7d" => Self::Last7Days,
            "30d" => Self::Last30Days,
            "month" => Self::ThisMonth,
            "custom" => {
                let parse = |s: Option<&str>| {
                    s.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                };
                match (parse(from), parse(to)) {
                    (Some(from), Some(to)) if from <= to => Self::Custom { from, to },
                    (Some(from), Some(to)) => Self::Custom { from: to, to: from },
                    _ => Self::All,
                }
            }
            _ => Self::All,
        }
    }

    /// Inclusive date bounds relative to `now`, or `None` for all time.
    #[must_use]
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(NaiveDate, NaiveDate)> {
        let today = now.date_naive();
        match *self {
            Self::Today => Some((today, today)),
            Self::Yesterday => {
                let yesterday = today - Duration::days(1);
                Some((yesterday, yesterday))
            }
            Self::Last7Days => Some((today - Duration::days(6), today)),
            Self::Last30Days => Some((today - Duration::days(29), today)),
            Self::ThisMonth => Some((today.with_day(1).unwrap_or(today), today)),
            Self::All => None,
            Self::Custom { from, to } => Some((from, to)),
        }
    }

    /// Whether `timestamp` falls inside this range as seen at `now`.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>, timestamp: DateTime<Utc>) -> bool {
        self.bounds(now).is_none_or(|(from, to)| {
            let day = timestamp.date_naive();
            from <= day && day <= to
        })
    }
}

/// Admin order list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub range: DateRange,
    pub status: Option<OrderStatus>,
    pub query: Option<String>,
}

impl OrderFilter {
    /// Whether `order` passes every set criterion.
    #[must_use]
    pub fn matches(&self, order: &Order, now: DateTime<Utc>) -> bool {
        if !self.range.contains(now, order.created_at) {
            return false;
        }

        if let Some(status) = &self.status
            && &order.status != status
        {
            return false;
        }

        match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(query) => {
                let needle = query.to_lowercase();
                order.id.as_str().to_lowercase().contains(&needle)
                    || order
                        .order_number
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
                    || order
                        .shipping_address
                        .full_name
                        .to_lowercase()
                        .contains(&needle)
            }
        }
    }
}

/// Split `orders` into those matching `filter` and the rest, keeping input order.
#[must_use]
pub fn partition<'a>(
    orders: &'a [Order],
    filter: &OrderFilter,
    now: DateTime<Utc>,
) -> (Vec<&'a Order>, Vec<&'a Order>) {
    orders.iter().partition(|order| filter.matches(order, now))
}

/// Counts and revenue over a set of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub count: usize,
    /// Sum of totals, excluding cancelled and returned orders.
    pub revenue: Decimal,
    pub by_status: BTreeMap<String, usize>,
}

impl OrderStats {
    #[must_use]
    pub fn collect<'a, I>(orders: I) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut stats = Self::default();
        for order in orders {
            stats.count += 1;
            if !order.status.is_voided() {
                stats.revenue += order.total;
            }
            *stats
                .by_status
                .entry(order.status.as_str().to_owned())
                .or_insert(0) += 1;
        }
        stats
    }

    /// Number of orders with `status`.
    #[must_use]
    pub fn count_of(&self, status: &OrderStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    fn order(id: &str, name: &str, status: &str, total: &str, created: DateTime<Utc>) -> Order {
        serde_json::from_value(json!({
            "_id": id,
            "orderNumber": format!("ORD-{id}"),
            "shippingAddress": {
                "fullName": name, "phone": "5550100", "line1": "1 Main St",
                "city": "Springfield", "state": "IL", "postalCode": "62701", "country": "US"
            },
            "status": status,
            "total": total,
            "createdAt": created.to_rfc3339(),
        }))
        .unwrap()
    }

    fn fixture() -> Vec<Order> {
        vec![
            order("a1", "Ada Lovelace", "pending", "100.00", now()),
            order("b2", "Grace Hopper", "shipped", "40.50", now() - Duration::days(1)),
            order("c3", "Alan Turing", "cancelled", "70.00", now() - Duration::days(5)),
            order("d4", "Ada Byron", "delivered", "25.00", now() - Duration::days(20)),
            order("e5", "Edsger Dijkstra", "returned", "15.00", now() - Duration::days(45)),
        ]
    }

    fn ids(orders: &[&Order]) -> Vec<String> {
        orders.iter().map(|o| o.id.to_string()).collect()
    }

    #[test]
    fn test_range_bounds() {
        let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert_eq!(
            DateRange::Last7Days.bounds(now()),
            Some((day("2024-06-09"), day("2024-06-15")))
        );
        assert_eq!(
            DateRange::ThisMonth.bounds(now()),
            Some((day("2024-06-01"), day("2024-06-15")))
        );
        assert_eq!(DateRange::All.bounds(now()), None);
    }

    #[test]
    fn test_from_query() {
        assert_eq!(DateRange::from_query(Some("7d"), None, None), DateRange::Last7Days);
        assert_eq!(DateRange::from_query(Some("nope"), None, None), DateRange::All);
        assert_eq!(
            DateRange::from_query(Some("custom"), Some("2024-06-10"), None),
            DateRange::All
        );
        let swapped = DateRange::from_query(Some("custom"), Some("2024-06-10"), Some("2024-06-01"));
        assert_eq!(swapped.bounds(now()).unwrap().0.to_string(), "2024-06-01");
    }

    #[test]
    fn test_partition_by_range_keeps_order() {
        let orders = fixture();
        let filter = OrderFilter {
            range: DateRange::Last7Days,
            ..OrderFilter::default()
        };
        let (matching, rest) = partition(&orders, &filter, now());
        assert_eq!(ids(&matching), ["a1", "b2", "c3"]);
        assert_eq!(ids(&rest), ["d4", "e5"]);
    }

    #[test]
    fn test_partition_by_status_and_query() {
        let orders = fixture();
        let filter = OrderFilter {
            range: DateRange::All,
            status: Some(OrderStatus::Pending),
            query: None,
        };
        let (matching, rest) = partition(&orders, &filter, now());
        assert_eq!(ids(&matching), ["a1"]);
        assert_eq!(rest.len(), 4);

        let filter = OrderFilter {
            query: Some("  ada ".to_string()),
            ..OrderFilter::default()
        };
        let (matching, _) = partition(&orders, &filter, now());
        assert_eq!(ids(&matching), ["a1", "d4"]);

        let filter = OrderFilter {
            query: Some("ord-c3".to_string()),
            ..OrderFilter::default()
        };
        let (matching, _) = partition(&orders, &filter, now());
        assert_eq!(ids(&matching), ["c3"]);
    }

    #[test]
    fn test_custom_range_is_inclusive() {
        let orders = fixture();
        let filter = OrderFilter {
            range: DateRange::from_query(Some("custom"), Some("2024-06-10"), Some("2024-06-14")),
            ..OrderFilter::default()
        };
        let (matching, _) = partition(&orders, &filter, now());
        assert_eq!(ids(&matching), ["b2", "c3"]);
    }

    #[test]
    fn test_stats_exclude_voided_revenue() {
        let orders = fixture();
        let stats = OrderStats::collect(&orders);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.revenue, Decimal::from_str("165.50").unwrap());
        assert_eq!(stats.count_of(&OrderStatus::Cancelled), 1);
        assert_eq!(stats.count_of(&OrderStatus::Processing), 0);
    }
}
