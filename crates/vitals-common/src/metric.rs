use serde::{Deserialize, Serialize};

/// Mutation semantics of a metric.
///
/// A gauge is replaced on every write; a counter accumulates every delta
/// ever applied. A metric id never changes kind once created.
///
/// # Examples
///
/// ```
/// use vitals_common::metric::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Counter => write!(f, "counter"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            _ => Err(format!("unknown metric kind: {s}")),
        }
    }
}

/// A named measurement.
///
/// Exactly one of `delta` (counter) or `value` (gauge) is populated; the
/// unused field is omitted from JSON so the wire payload is unambiguous
/// about which semantics apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge,
            delta: None,
            value: Some(value),
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter,
            delta: Some(delta),
            value: None,
        }
    }
}

impl From<&Metric> for crate::proto::Metric {
    fn from(m: &Metric) -> Self {
        crate::proto::Metric {
            id: m.id.clone(),
            kind: m.kind.to_string(),
            delta: m.delta.unwrap_or_default(),
            value: m.value.unwrap_or_default(),
        }
    }
}

impl TryFrom<crate::proto::Metric> for Metric {
    type Error = String;

    fn try_from(p: crate::proto::Metric) -> Result<Self, Self::Error> {
        let kind: MetricKind = p.kind.parse()?;
        Ok(match kind {
            MetricKind::Gauge => Metric::gauge(p.id, p.value),
            MetricKind::Counter => Metric::counter(p.id, p.delta),
        })
    }
}

/// One immutable, ordered batch of metrics produced by a single collection
/// tick. Serializes as a plain JSON array; this is the unit of transport and
/// the unit of batch application on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<Metric>);

impl Snapshot {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self(metrics)
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.0
    }

    pub fn into_metrics(self) -> Vec<Metric> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_json_omits_delta() {
        let json = serde_json::to_string(&Metric::gauge("HeapFree", 12.5)).unwrap();
        assert_eq!(json, r#"{"id":"HeapFree","type":"gauge","value":12.5}"#);
    }

    #[test]
    fn counter_json_omits_value() {
        let json = serde_json::to_string(&Metric::counter("PollCount", 7)).unwrap();
        assert_eq!(json, r#"{"id":"PollCount","type":"counter","delta":7}"#);
    }

    #[test]
    fn metric_json_round_trip() {
        let m = Metric::counter("PollCount", -3);
        let back: Metric = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn snapshot_serializes_as_array() {
        let snap = Snapshot::new(vec![
            Metric::gauge("RandomValue", 0.5),
            Metric::counter("PollCount", 1),
        ]);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.starts_with('['));
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn kind_rejects_unknown() {
        assert!("histogram".parse::<MetricKind>().is_err());
    }

    #[test]
    fn proto_conversion_picks_payload_by_kind() {
        let p = crate::proto::Metric {
            id: "PollCount".into(),
            kind: "counter".into(),
            delta: 4,
            value: 99.0,
        };
        let m = Metric::try_from(p).unwrap();
        assert_eq!(m, Metric::counter("PollCount", 4));
        assert_eq!(m.value, None);
    }
}
