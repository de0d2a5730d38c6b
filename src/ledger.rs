// 📒 Points Ledger - one record per normalized member
// Outer-join merges per category, derived totals recomputed after every merge

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// MEMBER KEY
// ============================================================================

/// Normalized member identity in `"Last, First"` form.
///
/// This is the only join key in the system. Two spellings that differ only in
/// comma/order placement must normalize to the same key before reaching the
/// ledger (see `names::NameNormalizer`). Joins are exact string equality —
/// no fuzzy matching.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberKey(String);

impl MemberKey {
    pub fn new(name: impl Into<String>) -> Self {
        MemberKey(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberKey {
    fn from(name: &str) -> Self {
        MemberKey(name.to_string())
    }
}

// ============================================================================
// CATEGORIES
// ============================================================================

/// The fixed scoring buckets. The first eight (SCORABLE) are summed into
/// `Total`; SelfReportedTotal is carried alongside but never added in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Training,
    Drills,
    Meetings,
    TourOfDuty,
    MiscActivity,
    CallsRespondedTo,
    PositionHeld,
    Disability,
    SelfReportedTotal,
}

impl Category {
    /// The categories that contribute to the derived Total.
    pub const SCORABLE: [Category; 8] = [
        Category::Training,
        Category::Drills,
        Category::Meetings,
        Category::TourOfDuty,
        Category::MiscActivity,
        Category::CallsRespondedTo,
        Category::PositionHeld,
        Category::Disability,
    ];

    /// Column heading used for display and export.
    pub fn column_name(&self) -> &'static str {
        match self {
            Category::Training => "Training",
            Category::Drills => "Drills",
            Category::Meetings => "Meetings",
            Category::TourOfDuty => "Tour of Duty",
            Category::MiscActivity => "Misc. Activity",
            Category::CallsRespondedTo => "Calls Responded To",
            Category::PositionHeld => "Position Held",
            Category::Disability => "Disability",
            Category::SelfReportedTotal => "SR_Total",
        }
    }
}

/// The export/display column contract, in order. Compatibility contract with
/// the downstream spreadsheet consumers — do not reorder.
pub const LEDGER_COLUMNS: [&str; 11] = [
    "Member Name",
    "Training",
    "Drills",
    "Meetings",
    "Tour of Duty",
    "Misc. Activity",
    "Calls Responded To",
    "Position Held",
    "Disability",
    "Total",
    "SR_Total",
];

// ============================================================================
// MEMBER RECORD
// ============================================================================

/// One member's scored categories. Every numeric field defaults to 0.0 —
/// never null — and `total` is derived, never merged in from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    #[serde(rename = "Member Name")]
    pub name: MemberKey,

    #[serde(rename = "Training")]
    pub training: f64,

    #[serde(rename = "Drills")]
    pub drills: f64,

    #[serde(rename = "Meetings")]
    pub meetings: f64,

    #[serde(rename = "Tour of Duty")]
    pub tour_of_duty: f64,

    #[serde(rename = "Misc. Activity")]
    pub misc_activity: f64,

    #[serde(rename = "Calls Responded To")]
    pub calls_responded_to: f64,

    #[serde(rename = "Position Held")]
    pub position_held: f64,

    #[serde(rename = "Disability")]
    pub disability: f64,

    /// Sum of the eight SCORABLE categories. Recomputed after every merge.
    #[serde(rename = "Total")]
    pub total: f64,

    #[serde(rename = "SR_Total")]
    pub self_reported_total: f64,
}

impl MemberRecord {
    /// Fresh record with every category at zero.
    pub fn new(name: MemberKey) -> Self {
        MemberRecord {
            name,
            training: 0.0,
            drills: 0.0,
            meetings: 0.0,
            tour_of_duty: 0.0,
            misc_activity: 0.0,
            calls_responded_to: 0.0,
            position_held: 0.0,
            disability: 0.0,
            total: 0.0,
            self_reported_total: 0.0,
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Training => self.training,
            Category::Drills => self.drills,
            Category::Meetings => self.meetings,
            Category::TourOfDuty => self.tour_of_duty,
            Category::MiscActivity => self.misc_activity,
            Category::CallsRespondedTo => self.calls_responded_to,
            Category::PositionHeld => self.position_held,
            Category::Disability => self.disability,
            Category::SelfReportedTotal => self.self_reported_total,
        }
    }

    pub fn set(&mut self, category: Category, value: f64) {
        match category {
            Category::Training => self.training = value,
            Category::Drills => self.drills = value,
            Category::Meetings => self.meetings = value,
            Category::TourOfDuty => self.tour_of_duty = value,
            Category::MiscActivity => self.misc_activity = value,
            Category::CallsRespondedTo => self.calls_responded_to = value,
            Category::PositionHeld => self.position_held = value,
            Category::Disability => self.disability = value,
            Category::SelfReportedTotal => self.self_reported_total = value,
        }
    }

    /// Recompute the derived total from the eight scorable categories.
    pub fn recompute_total(&mut self) {
        self.total = Category::SCORABLE.iter().map(|c| self.get(*c)).sum();
    }

    /// The numeric fields in export column order (everything after the name).
    pub fn numeric_row(&self) -> [f64; 10] {
        [
            self.training,
            self.drills,
            self.meetings,
            self.tour_of_duty,
            self.misc_activity,
            self.calls_responded_to,
            self.position_held,
            self.disability,
            self.total,
            self.self_reported_total,
        ]
    }
}

// ============================================================================
// MEMBER UPDATE
// ============================================================================

/// One member's partial category values as produced by an importer.
/// Only the categories listed here are written during a merge; everything
/// else on the record is left alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub key: MemberKey,
    pub values: Vec<(Category, f64)>,
}

impl MemberUpdate {
    pub fn new(key: MemberKey) -> Self {
        MemberUpdate {
            key,
            values: Vec::new(),
        }
    }

    /// Builder pattern: add one category value.
    pub fn set(mut self, category: Category, value: f64) -> Self {
        self.values.push((category, value));
        self
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// The single persistent state of the engine: one `MemberRecord` per
/// `MemberKey`, always iterated in key order.
///
/// The ledger is an owned value under a single-writer contract. It is
/// created empty, mutated only by `apply` and `clear`, and read (never
/// mutated) by display/export collaborators.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: BTreeMap<MemberKey, MemberRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            records: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reset to empty (the "New"/"Clear" operation).
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn get(&self, key: &MemberKey) -> Option<&MemberRecord> {
        self.records.get(key)
    }

    /// Records in key order.
    pub fn records(&self) -> impl Iterator<Item = &MemberRecord> {
        self.records.values()
    }

    pub fn member_keys(&self) -> impl Iterator<Item = &MemberKey> {
        self.records.keys()
    }

    /// Merge one importer's output into the ledger.
    ///
    /// Outer-join semantics: keys not seen before get a fresh zeroed record;
    /// for each incoming key, exactly the categories the update supplies are
    /// overwritten (last-write-wins, never additive). Untouched categories
    /// keep their value for existing members and stay 0 for new ones.
    /// Totals are recomputed for every record afterwards, so re-running an
    /// importer with the same input is idempotent.
    pub fn apply(&mut self, updates: &[MemberUpdate]) {
        for update in updates {
            let record = self
                .records
                .entry(update.key.clone())
                .or_insert_with(|| MemberRecord::new(update.key.clone()));
            for (category, value) in &update.values {
                record.set(*category, *value);
            }
        }
        self.recompute_totals();
    }

    /// Recompute the derived Total for every record.
    pub fn recompute_totals(&mut self) {
        for record in self.records.values_mut() {
            record.recompute_total();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
