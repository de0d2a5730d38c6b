// 🧮 Category Scoring - pure point formulas
// One stateless function per category; raw hours/counts in, points out.
// Missing measurements never reach these functions — importers default them
// upstream — so every formula is total.

use serde::{Deserialize, Serialize};

/// Disability points are always clipped to this maximum.
pub const DISABILITY_MAX_POINTS: f64 = 5.0;

/// One-half point for each 6 hours of scheduled duty.
const DUTY_HOURS_PER_POINT: f64 = 12.0;

// ============================================================================
// CAP POLICY
// ============================================================================

/// The program's paper rules describe annual caps that the recorded process
/// never enforced (Tour of Duty max 20, Calls max 25, tiered Training).
/// They are available here as configuration, all off by default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapPolicy {
    /// Annual Tour of Duty ceiling (documented: 20.0).
    pub tour_of_duty_cap: Option<f64>,

    /// Annual Calls Responded To ceiling (documented: 25.0).
    pub calls_cap: Option<f64>,

    /// Tiered Training caps: under 20 hours at most 5 points, 20–45 hours
    /// 10 points, over 45 hours a flat 15 points.
    pub training_tiers: bool,
}

impl CapPolicy {
    /// Everything off — the behavior the recorded process actually had.
    pub fn none() -> Self {
        CapPolicy::default()
    }

    /// The caps as documented in the program rules.
    pub fn documented() -> Self {
        CapPolicy {
            tour_of_duty_cap: Some(20.0),
            calls_cap: Some(25.0),
            training_tiers: true,
        }
    }
}

// ============================================================================
// ROUNDING
// ============================================================================

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// FORMULAS
// ============================================================================

/// Tour of Duty: scheduled duty hours / 12, rounded to 2 decimals.
pub fn tour_of_duty_points(shift_hours: f64, caps: &CapPolicy) -> f64 {
    let points = round2(shift_hours / DUTY_HOURS_PER_POINT);
    match caps.tour_of_duty_cap {
        Some(cap) => points.min(cap),
        None => points,
    }
}

/// Calls Responded To: one-half point per incident-response row.
pub fn calls_responded_points(call_count: f64, caps: &CapPolicy) -> f64 {
    let points = call_count / 2.0;
    match caps.calls_cap {
        Some(cap) => points.min(cap),
        None => points,
    }
}

/// Meetings: 1 point per attendance row, irrespective of duration.
pub fn meeting_points(attendance_count: usize) -> f64 {
    attendance_count as f64
}

/// Training: 1 point per summed hour, with optional tiered caps.
pub fn training_points(summed_hours: f64, caps: &CapPolicy) -> f64 {
    if !caps.training_tiers {
        return summed_hours;
    }
    if summed_hours > 45.0 {
        15.0
    } else if summed_hours >= 20.0 {
        10.0
    } else {
        summed_hours.min(5.0)
    }
}

/// Drills / CMEs: passthrough sum of the pre-supplied Points column.
pub fn drill_points(summed_points: f64) -> f64 {
    summed_points
}

/// Miscellaneous activity: passthrough sum of the Points column.
pub fn misc_activity_points(summed_points: f64) -> f64 {
    summed_points
}

/// Disability: passthrough sum, clipped to [0, 5].
pub fn disability_points(summed_points: f64) -> f64 {
    summed_points.clamp(0.0, DISABILITY_MAX_POINTS)
}

/// Self-reported signup hours: hours / 12, rounded to 3 decimals.
pub fn self_reported_signup_points(hours: f64) -> f64 {
    round3(hours / DUTY_HOURS_PER_POINT)
}

/// Self-reported calls: one-half point per call.
pub fn self_reported_call_points(call_count: f64) -> f64 {
    call_count / 2.0
}

/// SR_Total: the two self-reported components combined.
pub fn self_reported_total(signup_hours: f64, call_count: f64) -> f64 {
    self_reported_signup_points(signup_hours) + self_reported_call_points(call_count)
}

// ============================================================================
// TESTS
// ============================================================================
