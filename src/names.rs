// 🪪 Name Normalization - canonical "Last, First" member keys
// The three sources spell the same person differently; everything funnels
// through here before touching the ledger.

use serde::{Deserialize, Serialize};

use crate::ledger::MemberKey;

// ============================================================================
// CORRECTION TABLE
// ============================================================================

/// One exact-match spelling correction, applied after canonicalization.
///
/// The roster export is known to carry at least one chronic misspelling
/// ("Smith, Jon" for "Smith, John"). Rather than patching it inline in one
/// importer, corrections live in configuration and are applied uniformly to
/// every source's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCorrection {
    pub from: String,
    pub to: String,
}

impl NameCorrection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        NameCorrection {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The corrections shipped by default, matching the known roster data.
pub fn known_roster_fixes() -> Vec<NameCorrection> {
    vec![NameCorrection::new("Smith, Jon", "Smith, John")]
}

// ============================================================================
// NAME NORMALIZER
// ============================================================================

/// Canonicalizes a free-text person name into `"Last, First"` form.
///
/// Rules:
/// - A name containing a comma is already canonical; only trailing
///   whitespace is trimmed.
/// - Otherwise the name is split on the *last* whitespace boundary: the
///   final token is the surname, everything before it is the (possibly
///   multi-word) first name. "Mary Jo Kopechne" → "Kopechne, Mary Jo" —
///   middle names and suffixes are deliberately not inferred.
/// - A name with no whitespace at all passes through unchanged.
/// - Corrections are applied last, by exact match on the canonical form.
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    corrections: Vec<NameCorrection>,
}

impl NameNormalizer {
    /// Normalizer with no corrections.
    pub fn new() -> Self {
        NameNormalizer {
            corrections: Vec::new(),
        }
    }

    pub fn with_corrections(corrections: Vec<NameCorrection>) -> Self {
        NameNormalizer { corrections }
    }

    pub fn normalize(&self, raw: &str) -> MemberKey {
        let name = raw.trim_end();

        let canonical = if name.contains(',') {
            name.to_string()
        } else {
            match name.rsplit_once(' ') {
                Some((first, last)) => format!("{}, {}", last, first),
                None => name.to_string(),
            }
        };

        for correction in &self.corrections {
            if correction.from == canonical {
                return MemberKey::new(correction.to.clone());
            }
        }

        MemberKey::new(canonical)
    }

    /// Collapse runs of doubled spaces. The incident-log export pads some
    /// full-name fields with them.
    pub fn collapse_spaces(raw: &str) -> String {
        let mut name = raw.to_string();
        while name.contains("  ") {
            name = name.replace("  ", " ");
        }
        name
    }
}

// ============================================================================
// TESTS
// ============================================================================
