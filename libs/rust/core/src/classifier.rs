//! Repair movement classification.
//!
//! A repair is conforming when its group holds exactly three transactions,
//! one each of movement codes 251, 161 and 252. Every other group becomes
//! an [`AnomalyRecord`] carrying all the ways it deviates from that pattern.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Expected movement codes, in the order their deviations are reported.
pub const EXPECTED_CODES: [i64; 3] = [251, 161, 252];
pub const EXPECTED_TOTAL: u64 = 3;
const EXPECTED_PER_CODE: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub repair_number: String,
    pub movement_code: i64,
}

impl TransactionRecord {
    pub fn new(repair_number: impl Into<String>, movement_code: i64) -> Self {
        Self { repair_number: repair_number.into(), movement_code }
    }
}

/// Per-repair accumulator: occurrences of each code plus the row count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementCodeTally {
    counts: BTreeMap<i64, u64>,
    total: u64,
}

impl MovementCodeTally {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, code: i64) {
        *self.counts.entry(code).or_insert(0) += 1;
        self.total += 1;
    }

    /// Occurrences of `code`; zero when the code was never seen.
    pub fn count(&self, code: i64) -> u64 { self.counts.get(&code).copied().unwrap_or(0) }

    pub fn total(&self) -> u64 { self.total }

    /// Distinct codes outside [`EXPECTED_CODES`], ascending.
    pub fn unexpected_codes(&self) -> Vec<i64> {
        self.counts.keys().copied().filter(|c| !EXPECTED_CODES.contains(c)).collect()
    }

    pub fn is_conforming(&self) -> bool {
        self.total == EXPECTED_TOTAL && EXPECTED_CODES.iter().all(|c| self.count(*c) == EXPECTED_PER_CODE)
    }

    /// Every way the group departs from the expected pattern, in report order.
    /// Empty for a conforming group.
    pub fn deviations(&self) -> Vec<Deviation> {
        if self.is_conforming() { return Vec::new(); }
        let mut out = Vec::new();
        if self.total != EXPECTED_TOTAL {
            out.push(Deviation::TotalCount { found: self.total });
        }
        for code in EXPECTED_CODES {
            let found = self.count(code);
            if found != EXPECTED_PER_CODE { out.push(Deviation::CodeCount { code, found }); }
        }
        let unexpected = self.unexpected_codes();
        if !unexpected.is_empty() { out.push(Deviation::UnexpectedCodes(unexpected)); }

        // Invariant guards: a non-conforming tally always trips one of the checks above.
        if out.is_empty() && self.total != EXPECTED_TOTAL { out.push(Deviation::CountMismatch); }
        if out.is_empty() { out.push(Deviation::Unclear); }
        out
    }

    pub fn counts(&self) -> &BTreeMap<i64, u64> { &self.counts }

    pub fn into_counts(self) -> BTreeMap<i64, u64> { self.counts }
}

/// One way a repair group deviates from the expected movement pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deviation {
    TotalCount { found: u64 },
    CodeCount { code: i64, found: u64 },
    UnexpectedCodes(Vec<i64>),
    CountMismatch,
    Unclear,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::TotalCount { found } => write!(f, "Total count is {found} (expected {EXPECTED_TOTAL})"),
            Deviation::CodeCount { code, found } => write!(f, "Count {code} is {found} (expected {EXPECTED_PER_CODE})"),
            Deviation::UnexpectedCodes(codes) => write!(f, "Contains unexpected codes: [{}]", codes.iter().join(", ")),
            Deviation::CountMismatch => f.write_str("Transaction count != 3, specific required code counts may be correct but extras exist"),
            Deviation::Unclear => f.write_str("Anomaly detected but reason unclear"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub repair_number: String,
    /// Never empty.
    pub reasons: Vec<String>,
    /// Full tally of every code seen for the repair, not just the expected ones.
    pub code_counts: BTreeMap<i64, u64>,
}

impl AnomalyRecord {
    pub fn reason_summary(&self) -> String { self.reasons.join(", ") }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Distinct repair numbers in the input.
    pub repairs_analyzed: usize,
    /// Non-conforming repairs, ascending by repair number.
    pub anomalies: Vec<AnomalyRecord>,
}

/// Groups `records` by repair number and evaluates every group.
pub fn analyze<'a, I>(records: I) -> Analysis
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut groups: BTreeMap<&'a str, MovementCodeTally> = BTreeMap::new();
    for r in records {
        groups.entry(r.repair_number.as_str()).or_default().record(r.movement_code);
    }
    let repairs_analyzed = groups.len();
    let anomalies = groups
        .into_iter()
        .filter(|(_, tally)| !tally.is_conforming())
        .map(|(repair, tally)| AnomalyRecord {
            repair_number: repair.to_string(),
            reasons: tally.deviations().iter().map(ToString::to_string).collect(),
            code_counts: tally.into_counts(),
        })
        .collect();
    Analysis { repairs_analyzed, anomalies }
}

/// Non-conforming repairs in `records`, ascending by repair number.
pub fn classify<'a, I>(records: I) -> Vec<AnomalyRecord>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    analyze(records).anomalies
}
