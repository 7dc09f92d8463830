use serde::{Deserialize, Serialize};

/// Kind of level test announced by the alert side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    SupportTest,
    ResistanceTest,
}

impl EventType {
    /// A support test proposes a long, a resistance test a short.
    pub fn side(self) -> Side {
        match self {
            EventType::SupportTest => Side::Long,
            EventType::ResistanceTest => Side::Short,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::SupportTest => "SUPPORT_TEST",
            EventType::ResistanceTest => "RESISTANCE_TEST",
        }
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

/// Incoming price-level event, created by the transport layer and consumed
/// read-only by the pipeline. Authenticity is the transport's problem;
/// identity and format validation belong to the admission ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    /// Timeframe label as sent by the alert (e.g. "30").
    pub timeframe: String,
    /// Bar open time, Unix seconds. Must post-date 2020-01-01.
    pub bar_time: i64,
    pub event_type: EventType,
    /// Central level price from the alert payload.
    pub level: f64,
    /// Half-width of the level zone.
    pub zone_half: f64,
    /// Alert-side level score ("sc"). Lives on the live scale, which is
    /// intentionally not comparable to the local level-book scale.
    #[serde(default)]
    pub level_score: f64,
}
