//! Artifact URL Rewriter
//!
//! Points every artifact descriptor under a record's artifact map at this
//! application's own artifact route, `{base}/{kind}/{handle}`, so consumers
//! never learn which system holds the bytes. Only `downloadUrl` is touched;
//! rewriting is idempotent.

use serde_json::{Map, Value};
use url::Url;

use crate::model::{string_value, ArtifactKind, CanonicalRecord};
use crate::store::validate_handle;

const URL_FIELD: &str = "downloadUrl";
const HANDLE_FIELDS: &[&str] = &["id", "handle", "fileId"];

#[derive(Debug, Clone)]
pub struct ArtifactUrlRewriter {
    base_url: String,
    base_origin: Option<url::Origin>,
    external_origin: Option<url::Origin>,
}

impl ArtifactUrlRewriter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base_origin = Url::parse(&base_url).ok().map(|u| u.origin());
        Self {
            base_url,
            base_origin,
            external_origin: None,
        }
    }

    /// Only direct links on `origin` (plus relative and same-origin links) are
    /// rewritten; links to any third origin are left alone.
    pub fn with_external_origin(mut self, origin: &str) -> Self {
        self.external_origin = Url::parse(origin).ok().map(|u| u.origin());
        self
    }

    /// Rewrite with the kind chosen per artifact model, see
    /// [`ArtifactKind::for_model`].
    pub fn rewrite_by_model(&self, records: &mut [CanonicalRecord]) {
        for record in records {
            for (model, value) in record.artifacts.iter_mut() {
                self.visit(value, ArtifactKind::for_model(model));
            }
        }
    }

    pub fn rewrite(&self, records: &mut [CanonicalRecord], kind: ArtifactKind) {
        for record in records {
            self.rewrite_artifacts(&mut record.artifacts, kind);
        }
    }

    fn rewrite_artifacts(&self, artifacts: &mut Map<String, Value>, kind: ArtifactKind) {
        for value in artifacts.values_mut() {
            self.visit(value, kind);
        }
    }

    fn visit(&self, value: &mut Value, kind: ArtifactKind) {
        match value {
            Value::Object(map) if is_descriptor(map) => self.rewrite_descriptor(map, kind),
            Value::Object(map) => {
                for nested in map.values_mut() {
                    self.visit(nested, kind);
                }
            }
            Value::Array(items) => {
                for nested in items {
                    self.visit(nested, kind);
                }
            }
            _ => {}
        }
    }

    fn rewrite_descriptor(&self, descriptor: &mut Map<String, Value>, kind: ArtifactKind) {
        let current = descriptor.get(URL_FIELD).and_then(Value::as_str);
        let parsed = current.and_then(|u| Url::parse(u).ok());

        if let (Some(external), Some(url)) = (&self.external_origin, &parsed) {
            let origin = url.origin();
            if &origin != external && Some(&origin) != self.base_origin.as_ref() {
                return;
            }
        }

        let handle = HANDLE_FIELDS
            .iter()
            .find_map(|key| descriptor.get(*key).and_then(string_value))
            .or_else(|| current.and_then(trailing_segment))
            .filter(|h| validate_handle(h).is_ok());

        let rewritten = match handle {
            Some(handle) => Value::String(format!("{}/{}/{}", self.base_url, kind.as_str(), handle)),
            None if current.is_some() => {
                // A link that cannot be proxied must not leak the other origin.
                tracing::warn!(url = current, "Dropping artifact link without usable handle");
                Value::Null
            }
            None => return,
        };
        descriptor.insert(URL_FIELD.to_string(), rewritten);
    }
}

/// An object is an artifact descriptor when it carries a download URL, or a
/// status next to a handle.
fn is_descriptor(map: &Map<String, Value>) -> bool {
    map.contains_key(URL_FIELD)
        || (map.contains_key("status") && HANDLE_FIELDS.iter().any(|k| map.contains_key(*k)))
}

fn trailing_segment(raw: &str) -> Option<String> {
    let url = Url::parse(raw)
        .or_else(|_| Url::parse("http://relative.invalid/").and_then(|base| base.join(raw)))
        .ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}
