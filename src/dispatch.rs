//! Boundary to the search backend.
//!
//! A [`Query`] becomes one to three [`Request`]s (main, normalize, subtract).
//! Only the main request asks for per-video detail. A [`SearchBackend`]
//! performs the actual I/O; [`Dispatcher`] issues the requests of a query in
//! parallel and waits for all of them before assembling a [`SearchResult`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, warn};
use url::Url;

use crate::error::DispatchError;
use crate::query::{Query, SecondaryKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Main,
    Normalize,
    Subtract,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Main => "main",
            Purpose::Normalize => "normalize",
            Purpose::Subtract => "subtract",
        }
    }
}

impl From<SecondaryKind> for Purpose {
    fn from(kind: SecondaryKind) -> Self {
        match kind {
            SecondaryKind::Normalize => Purpose::Normalize,
            SecondaryKind::Subtract => Purpose::Subtract,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Size of the time buckets the backend aggregates into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Day => "day",
            Aggregation::Week => "week",
            Aggregation::Month => "month",
            Aggregation::Year => "year",
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Aggregation::Day),
            "week" => Ok(Aggregation::Week),
            "month" => Ok(Aggregation::Month),
            "year" => Ok(Aggregation::Year),
            other => Err(format!(
                "unknown aggregation \"{}\"; use day, week, month or year",
                other
            )),
        }
    }
}

/// Inclusive range of air dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DispatchError> {
        if start > end {
            return Err(DispatchError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub purpose: Purpose,
    /// Wire form of the tree; `None` matches everything
    pub serialized_tree: Option<String>,
    pub detailed: bool,
    pub date_range: DateRange,
    pub aggregation: Aggregation,
}

impl Request {
    /// Query parameters, sorted by name
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("detailed", self.detailed.to_string()),
            ("start_date", self.date_range.start.format(DATE_FORMAT).to_string()),
            ("end_date", self.date_range.end.format(DATE_FORMAT).to_string()),
            ("aggregate", self.aggregation.as_str().to_string()),
        ];
        if let Some(tree) = &self.serialized_tree {
            params.push(("query", tree.clone()));
        }
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
    }

    /// Form-encoded parameters, stable for identical requests
    pub fn query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.params() {
            serializer.append_pair(name, &value);
        }
        serializer.finish()
    }

    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(Some(&self.query_string()));
        url
    }
}

/// Builds the requests for `query`: main first, then the secondary one if any.
pub fn to_requests(query: &Query, date_range: DateRange, aggregation: Aggregation) -> Vec<Request> {
    let mut requests = vec![Request {
        purpose: Purpose::Main,
        serialized_tree: query.main().map(|tree| tree.to_wire()),
        detailed: true,
        date_range,
        aggregation,
    }];
    if let Some(secondary) = query.secondary() {
        requests.push(Request {
            purpose: secondary.kind().into(),
            serialized_tree: secondary.tree().map(|tree| tree.to_wire()),
            detailed: false,
            date_range,
            aggregation,
        });
    }
    requests
}

/// Time bucket → matching `(video_id, duration)` pairs
pub type DetailedBuckets = BTreeMap<String, Vec<(u64, f64)>>;
/// Time bucket → aggregate value
pub type TotalBuckets = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Detailed(DetailedBuckets),
    Totals(TotalBuckets),
}

impl Response {
    /// Decodes a backend body; `detailed` must match the request that produced it.
    pub fn from_json(detailed: bool, body: &str) -> serde_json::Result<Self> {
        if detailed {
            serde_json::from_str(body).map(Response::Detailed)
        } else {
            serde_json::from_str(body).map(Response::Totals)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    pub main: DetailedBuckets,
    pub normalize: Option<TotalBuckets>,
    pub subtract: Option<TotalBuckets>,
}

/// Performs a single request. Implementations own timeouts and transport.
pub trait SearchBackend: Sync {
    fn fetch(&self, request: &Request) -> anyhow::Result<Response>;
}

pub struct Dispatcher<B> {
    backend: B,
}

impl<B: SearchBackend> Dispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs the requests of `query` in parallel. All of them finish before
    /// the result, or the first failure in request order, is returned.
    pub fn execute(
        &self,
        query: &Query,
        date_range: DateRange,
        aggregation: Aggregation,
    ) -> Result<SearchResult, DispatchError> {
        let requests = to_requests(query, date_range, aggregation);
        let responses: Vec<(Purpose, anyhow::Result<Response>)> = requests
            .par_iter()
            .map(|request| {
                debug!(purpose = %request.purpose, query = %request.query_string(), "dispatching");
                let response = self.backend.fetch(request);
                if let Err(e) = &response {
                    warn!(purpose = %request.purpose, error = %e, "search request failed");
                }
                (request.purpose, response)
            })
            .collect();

        let mut result = SearchResult::default();
        for (purpose, response) in responses {
            let response =
                response.map_err(|source| DispatchError::Backend { purpose, source })?;
            match (purpose, response) {
                (Purpose::Main, Response::Detailed(buckets)) => result.main = buckets,
                (Purpose::Normalize, Response::Totals(buckets)) => {
                    result.normalize = Some(buckets)
                }
                (Purpose::Subtract, Response::Totals(buckets)) => result.subtract = Some(buckets),
                (purpose, _) => return Err(DispatchError::UnexpectedShape { purpose }),
            }
        }
        Ok(result)
    }

    /// Runs several queries in parallel. Results are in submission order,
    /// whatever order the queries completed in.
    pub fn execute_all(
        &self,
        queries: &[Query],
        date_range: DateRange,
        aggregation: Aggregation,
    ) -> Vec<Result<SearchResult, DispatchError>> {
        // Indexed parallel collect keeps input order.
        queries
            .par_iter()
            .map(|query| self.execute(query, date_range, aggregation))
            .collect()
    }
}
