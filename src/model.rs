use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only instant type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const HOUR_MS: Ms = 60 * MINUTE_MS;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// Whole minutes between two instants, rounded half up.
///
/// Negative when `end < start`; callers that need a non-negative result clamp first.
/// Saturates instead of overflowing on instants far apart.
pub fn duration_minutes(start: Ms, end: Ms) -> i64 {
    end.saturating_sub(start)
        .saturating_add(MINUTE_MS / 2)
        .div_euclid(MINUTE_MS)
}

/// Half-open interval `[start, end)`.
///
/// Construction never panics: an inverted span is simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Length in ms, zero for empty or inverted spans.
    pub fn duration_ms(&self) -> Ms {
        self.end.saturating_sub(self.start).max(0)
    }

    pub fn duration_minutes(&self) -> i64 {
        duration_minutes(self.start, self.end.max(self.start))
    }

    /// Touching spans do not overlap; empty spans overlap nothing.
    pub fn overlaps(&self, other: &Span) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end
            && other.start < self.end
    }

    /// `[max(starts), min(ends)]`. May come back inverted, which reads as zero length.
    pub fn clamp_to(&self, other: &Span) -> Span {
        Span {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

// ── Workstations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkstationId {
    A,
    B,
    C,
    D,
}

impl WorkstationId {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkstationId::A => "A",
            WorkstationId::B => "B",
            WorkstationId::C => "C",
            WorkstationId::D => "D",
        }
    }
}

impl fmt::Display for WorkstationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkstationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(WorkstationId::A),
            "B" => Ok(WorkstationId::B),
            "C" => Ok(WorkstationId::C),
            "D" => Ok(WorkstationId::D),
            other => Err(format!("unknown workstation: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workstation {
    pub id: WorkstationId,
    pub name: &'static str,
}

pub const WORKSTATIONS: [Workstation; 4] = [
    Workstation { id: WorkstationId::A, name: "Workstation A" },
    Workstation { id: WorkstationId::B, name: "Workstation B" },
    Workstation { id: WorkstationId::C, name: "Workstation C" },
    Workstation { id: WorkstationId::D, name: "Workstation D" },
];

pub fn workstation(id: WorkstationId) -> &'static Workstation {
    match id {
        WorkstationId::A => &WORKSTATIONS[0],
        WorkstationId::B => &WORKSTATIONS[1],
        WorkstationId::C => &WORKSTATIONS[2],
        WorkstationId::D => &WORKSTATIONS[3],
    }
}

// ── Reservations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Active,
    Cancelled,
}

/// A booked slot on one workstation. Cancelled rows stay around for audit
/// but take no part in occupancy or overlap reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub workstation_id: WorkstationId,
    pub first_name: String,
    pub last_name: String,
    pub span: Span,
    pub created_at: Ms,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    pub fn holder(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input to the authoritative commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub workstation_id: WorkstationId,
    pub span: Span,
    pub first_name: String,
    pub last_name: String,
}

/// Filter for listing reservations overlapping `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationQuery {
    pub workstation_id: Option<WorkstationId>,
    pub window: Span,
    pub include_cancelled: bool,
}

impl ReservationQuery {
    pub fn active(window: Span) -> Self {
        Self {
            workstation_id: None,
            window,
            include_cancelled: false,
        }
    }

    pub fn for_workstation(workstation_id: WorkstationId, window: Span) -> Self {
        Self {
            workstation_id: Some(workstation_id),
            window,
            include_cancelled: false,
        }
    }

    /// `stored.start < window.end && stored.end > window.start`.
    pub fn matches(&self, r: &Reservation) -> bool {
        if !self.include_cancelled && !r.is_active() {
            return false;
        }
        if let Some(ws) = self.workstation_id
            && ws != r.workstation_id
        {
            return false;
        }
        r.span.start < self.window.end && r.span.end > self.window.start
    }
}

// ── Configuration ────────────────────────────────────────────────

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

/// Opening hours for one weekday. Same-day windows only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningRule {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
    pub enabled: bool,
}

impl OpeningRule {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close, enabled: true }
    }

    pub fn closed(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close, enabled: false }
    }

    pub fn is_degenerate(&self) -> bool {
        self.close <= self.open
    }
}

/// Weekday (0 = Sunday … 6 = Saturday) → rule. Missing keys mean closed.
///
/// Keys travel as strings (`"0"`..`"6"`) on the wire. Any other key is
/// ignored with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, OpeningRule>", into = "BTreeMap<String, OpeningRule>")]
pub struct OpeningHours(BTreeMap<u8, OpeningRule>);

impl From<BTreeMap<String, OpeningRule>> for OpeningHours {
    fn from(raw: BTreeMap<String, OpeningRule>) -> Self {
        let mut by_day = BTreeMap::new();
        for (key, rule) in raw {
            match key.trim().parse::<u8>() {
                Ok(weekday) if weekday <= 6 => {
                    by_day.insert(weekday, rule);
                }
                _ => tracing::warn!("ignoring opening hours for unknown weekday key {key:?}"),
            }
        }
        Self(by_day)
    }
}

impl From<OpeningHours> for BTreeMap<String, OpeningRule> {
    fn from(hours: OpeningHours) -> Self {
        hours.0.into_iter().map(|(d, r)| (d.to_string(), r)).collect()
    }
}

impl OpeningHours {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Every weekday open with the same window.
    pub fn uniform(open: NaiveTime, close: NaiveTime) -> Self {
        Self((0..7).map(|d| (d, OpeningRule::new(open, close))).collect())
    }

    pub fn with_rule(mut self, weekday: u8, rule: OpeningRule) -> Self {
        self.set(weekday, rule);
        self
    }

    pub fn set(&mut self, weekday: u8, rule: OpeningRule) {
        self.0.insert(weekday, rule);
    }

    pub fn rule_for(&self, weekday: u8) -> Option<&OpeningRule> {
        self.0.get(&weekday)
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &OpeningRule> {
        self.0.values().filter(|r| r.enabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLimits {
    pub min_slot_minutes: i64,
    pub max_slot_minutes: i64,
    pub booking_horizon_days: u32,
    /// Not enforced here.
    pub max_capacity: u32,
}

impl Default for BookingLimits {
    fn default() -> Self {
        Self {
            min_slot_minutes: 30,
            max_slot_minutes: 240,
            booking_horizon_days: 14,
            max_capacity: 1,
        }
    }
}

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

/// The single global booking policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub opening_hours_by_day: OpeningHours,
    #[serde(flatten)]
    pub limits: BookingLimits,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

impl Settings {
    pub fn new(opening_hours_by_day: OpeningHours, limits: BookingLimits, timezone: Tz) -> Self {
        Self {
            opening_hours_by_day,
            limits,
            timezone,
        }
    }
}

// ── Derived state ────────────────────────────────────────────────

/// Ordered so that `Free < Partial < Full`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOccupancy {
    #[default]
    Free,
    Partial,
    Full,
}

impl DayOccupancy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOccupancy::Free => "free",
            DayOccupancy::Partial => "partial",
            DayOccupancy::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardState {
    pub current: Option<Reservation>,
    pub next: Option<Reservation>,
    pub day: DayOccupancy,
}

impl CardState {
    pub fn is_reserved_now(&self) -> bool {
        self.current.is_some()
    }
}

// ── Change notifications ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Cancelled,
    Deleted,
}

/// "Reservation data may have changed; re-fetch."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub reservation_id: Ulid,
    pub workstation_id: WorkstationId,
    pub kind: ChangeKind,
}
