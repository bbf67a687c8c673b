//! Batch request as it arrives on the wire.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::command::field;
use crate::destination::resolve_destination;
use crate::error::DestinationError;
use crate::scheduler::Batch;

const DEFAULT_CONCURRENCY: i64 = 3;

/// `{destination, links, concurrency, throttleBytesPerSecond}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Relative to the configured root; empty = the root itself.
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: i64,
    #[serde(default)]
    pub throttle_bytes_per_second: i64,
}

fn default_concurrency() -> i64 {
    DEFAULT_CONCURRENCY
}

const FIELDS: [&str; 4] = ["destination", "links", "concurrency", "throttleBytesPerSecond"];

impl DownloadRequest {
    pub fn new(destination: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            destination: destination.into(),
            links,
            concurrency: DEFAULT_CONCURRENCY,
            throttle_bytes_per_second: 0,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Deserialize with field names matched case-insensitively.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let value = match value {
            Value::Object(obj) => {
                let mut canonical = Map::new();
                for name in FIELDS {
                    if let Some(v) = field(&obj, name) {
                        canonical.insert(name.to_string(), v.clone());
                    }
                }
                Value::Object(canonical)
            }
            other => other,
        };
        serde_json::from_value(value)
    }

    /// Whether an inbound message is a batch submission rather than a control command.
    pub fn looks_like(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|obj| field(obj, "links").is_some())
    }

    /// Validate the destination under `root` and produce a schedulable batch.
    pub fn into_batch(self, root: &Path) -> Result<Batch, DestinationError> {
        let destination_dir = resolve_destination(root, &self.destination)?;
        Ok(Batch {
            urls: self.links,
            destination_dir,
            concurrency: self.concurrency,
            throttle_bytes_per_sec: self.throttle_bytes_per_second,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply() {
        let req = DownloadRequest::from_json(r#"{"links":["http://h/a"]}"#).unwrap();
        assert_eq!(req.destination, "");
        assert_eq!(req.concurrency, 3);
        assert_eq!(req.throttle_bytes_per_second, 0);
        assert_eq!(req.links, vec!["http://h/a".to_string()]);
    }

    #[test]
    fn field_names_are_case_insensitive() {
        let req = DownloadRequest::from_json(
            r#"{"Destination":"music","LINKS":["u"],"Concurrency":5,"throttlebytespersecond":1024}"#,
        )
        .unwrap();
        assert_eq!(req.destination, "music");
        assert_eq!(req.links, vec!["u".to_string()]);
        assert_eq!(req.concurrency, 5);
        assert_eq!(req.throttle_bytes_per_second, 1024);
    }

    #[test]
    fn absent_links_is_empty() {
        let req = DownloadRequest::from_json(r#"{"destination":"x"}"#).unwrap();
        assert!(req.links.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(DownloadRequest::new("d", vec![])).unwrap();
        assert_eq!(
            v,
            json!({"destination":"d","links":[],"concurrency":3,"throttleBytesPerSecond":0})
        );
    }

    #[test]
    fn wrong_types_rejected() {
        assert!(DownloadRequest::from_json(r#"{"links":"not-a-list"}"#).is_err());
        assert!(DownloadRequest::from_json("[]").is_err());
    }

    #[test]
    fn looks_like_requires_links() {
        assert!(DownloadRequest::looks_like(&json!({"Links": []})));
        assert!(!DownloadRequest::looks_like(&json!({"command": "clear"})));
        assert!(!DownloadRequest::looks_like(&json!("links")));
    }

    #[test]
    fn into_batch_resolves_destination() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("in")).unwrap();
        let mut req = DownloadRequest::new("in", vec!["http://h/f".into()]);
        req.concurrency = 0;
        let batch = req.into_batch(tmp.path()).unwrap();
        assert_eq!(batch.destination_dir, tmp.path().canonicalize().unwrap().join("in"));
        assert_eq!(batch.concurrency, 0);

        let bad = DownloadRequest::new("missing", vec![]);
        assert!(bad.into_batch(tmp.path()).is_err());
    }
}
