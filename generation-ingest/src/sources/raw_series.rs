use time::{OffsetDateTime, PrimitiveDateTime};

use crate::civil_time::CivilTz;

/// Identity of one value column in a [`RawSeries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    /// A single production-type label.
    Flat(String),
    /// `(fuel type, fuel detail)`; either part may be absent.
    Composite(Option<String>, Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeIndex {
    /// Instants with a known offset.
    Aware(Vec<OffsetDateTime>),
    /// Wall-clock times in the series' request timezone.
    Naive(Vec<PrimitiveDateTime>),
}

impl TimeIndex {
    pub fn len(&self) -> usize {
        match self {
            Self::Aware(ts) => ts.len(),
            Self::Naive(ts) => ts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wide, time-indexed generation table for one zone as returned upstream.
///
/// `rows[i][j]` is the value of `columns[j]` at `index[i]`; `None` means nothing
/// was reported for that cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub index: TimeIndex,
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<Vec<Option<f64>>>,
    /// Civil timezone the request was made in.
    pub request_tz: CivilTz,
}

impl RawSeries {
    pub fn empty(request_tz: CivilTz) -> Self {
        Self {
            index: TimeIndex::Aware(Vec::new()),
            columns: Vec::new(),
            rows: Vec::new(),
            request_tz,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    /// `(timestamps, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }
}
