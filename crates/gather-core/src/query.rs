//! Event search model.
//!
//! [`SearchParams`] is the raw, string-typed query accepted from clients.
//! [`EventQuery::from_params`] normalizes it into a typed query that a
//! store can execute directly: malformed dates are dropped with a
//! warning, unknown prices mean "no filter", unknown sorts fall back to
//! score order, and bad page numbers fall back to the first page.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use gather_types::{Event, PriceFilter, SortOrder};
use serde::Deserialize;
use tracing::warn;

/// Default number of events per page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Raw search parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Case-insensitive title substring.
    pub query: Option<String>,
    /// Exact event type.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Start day in `YYYY-MM-DD` form.
    pub date: Option<String>,
    /// `free` or `paid`.
    pub price: Option<String>,
    /// `date-asc`, `date-desc` or `popular`.
    pub sort: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
}

/// Half-open interval `[from, until)` that an event's start time must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartWindow {
    /// Inclusive lower bound.
    pub from: DateTime<Utc>,
    /// Exclusive upper bound.
    pub until: DateTime<Utc>,
}

impl StartWindow {
    /// The window covering one UTC calendar day.
    pub fn for_day(day: NaiveDate) -> Self {
        let from = day.and_time(NaiveTime::MIN).and_utc();
        Self {
            from,
            until: from + Duration::days(1),
        }
    }

    /// Whether `instant` falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.until
    }
}

/// A page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Number of events per page, at least 1.
    pub size: u32,
}

impl Page {
    /// Build a page request, clamping both values to at least 1.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)).saturating_mul(u64::from(self.size))
    }

    /// Number of rows to return.
    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// A normalized event search, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Case-insensitive title substring.
    pub title_contains: Option<String>,
    /// Exact event type.
    pub event_type: Option<String>,
    /// Restricts start times to a single day.
    pub start_window: Option<StartWindow>,
    /// Cost filter.
    pub price: Option<PriceFilter>,
    /// Only events whose end time is at or after this instant.
    pub ends_on_or_after: DateTime<Utc>,
    /// Ordering.
    pub sort: SortOrder,
    /// Page to return.
    pub page: Page,
}

impl EventQuery {
    /// Normalize raw parameters against the current time.
    ///
    /// Past events are excluded by comparing end times against the start
    /// of the current UTC day, so an event that ended earlier today is
    /// still listed.
    pub fn from_params(params: &SearchParams, now: DateTime<Utc>, page_size: u32) -> Self {
        let start_window = params.date.as_deref().and_then(|raw| match parse_day(raw) {
            Some(day) => Some(StartWindow::for_day(day)),
            None => {
                warn!(date = raw, "Ignoring invalid date filter");
                None
            }
        });

        let page_number = params
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(1);

        Self {
            title_contains: non_empty(params.query.as_deref()),
            event_type: non_empty(params.event_type.as_deref()),
            start_window,
            price: params.price.as_deref().and_then(PriceFilter::from_param),
            ends_on_or_after: start_of_day(now),
            sort: params
                .sort
                .as_deref()
                .map_or(SortOrder::Score, SortOrder::from_param),
            page: Page::new(page_number, page_size),
        }
    }

    /// Whether `event` satisfies every filter of this query.
    ///
    /// Stores that cannot push filters down (the in-memory store) use this
    /// directly; the SQL store mirrors it in its `WHERE` clause.
    pub fn matches(&self, event: &Event) -> bool {
        if !event
            .end_time
            .is_some_and(|end| end >= self.ends_on_or_after)
        {
            return false;
        }
        if let Some(needle) = &self.title_contains {
            if !event.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(event_type) = &self.event_type {
            if &event.event_type != event_type {
                return false;
            }
        }
        if let Some(window) = &self.start_window {
            if !window.contains(event.start_time) {
                return false;
            }
        }
        match self.price {
            Some(PriceFilter::Free) => event.cost.is_some_and(|c| c.is_zero()),
            Some(PriceFilter::Paid) => event
                .cost
                .is_some_and(|c| c > rust_decimal::Decimal::ZERO),
            None => true,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    /// Events on this page.
    pub events: Vec<Event>,
    /// Number of events matching the filters across all pages.
    pub total: u64,
    /// The page that was requested.
    pub page: Page,
}

impl EventPage {
    /// Total number of pages, `ceil(total / page size)`.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page.size.max(1)))
    }
}

/// Parse a strict `YYYY-MM-DD` day.
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
