//! Generic connector for sources that answer a lookup with a JSON document.
//!
//! The lookup URL is the site's resolved base URL joined with a path template
//! in which `{id}` stands for the movie's id. The response is either a single
//! object, or an array of candidate objects of which exactly one must exist.
//! Object keys that name a record field are copied into the record; anything
//! else is ignored.

use std::sync::Arc;

use async_trait::async_trait;
use avscout_core::{Field, FieldKind, FieldValue, MetadataRecord};
use avscout_lib::ConnectorSettings;
use serde_json::{Map, Value};

use crate::client::{FetchRequest, HttpPool};
use crate::connector::{Connector, ConnectorFactory, CrawlTarget};
use crate::context::RunContext;
use crate::error::ConnectorError;

pub struct JsonSourceFactory {
    id: String,
    settings: ConnectorSettings,
}

impl JsonSourceFactory {
    pub fn new(id: &str, settings: ConnectorSettings) -> Self {
        Self {
            id: id.to_string(),
            settings,
        }
    }
}

#[async_trait]
impl ConnectorFactory for JsonSourceFactory {
    fn site_id(&self) -> &str {
        &self.id
    }

    async fn create(&self, ctx: &RunContext) -> Result<Arc<dyn Connector>, ConnectorError> {
        let api_key = match &self.settings.api_key_env {
            Some(var) => {
                let key = std::env::var(var)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        ConnectorError::credential(&self.id, format!("set {} to an API key", var))
                    })?;
                Some((self.settings.api_key_header.clone(), key))
            }
            None => None,
        };

        let base = ctx.resolver().resolve(&self.id, &self.settings.url).await;
        log::debug!("{}: base URL {}", self.id, base);

        Ok(Arc::new(JsonSource {
            id: self.id.clone(),
            base,
            path: self.settings.path.clone(),
            detail_path: self.settings.detail_path.clone(),
            api_key,
            http: Arc::clone(ctx.http()),
        }))
    }
}

pub struct JsonSource {
    id: String,
    base: String,
    path: String,
    detail_path: Option<String>,
    /// Header name and value
    api_key: Option<(String, String)>,
    http: Arc<HttpPool>,
}

impl JsonSource {
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, template: &str, id: &str) -> String {
        let path = template.replace("{id}", id);
        let base = self.base.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn fetch(&self, template: &str, id: &str) -> Result<Map<String, Value>, ConnectorError> {
        let mut request = FetchRequest::new(&self.id, id, self.url(template, id));
        if let Some((header, key)) = &self.api_key {
            request = request.header(header.as_str(), key.as_str());
        }
        let body = self.http.get_json(&request).await?;
        single_object(&self.id, id, body)
    }
}

#[async_trait]
impl Connector for JsonSource {
    fn site_id(&self) -> &str {
        &self.id
    }

    async fn crawl_and_fill(
        &self,
        target: &CrawlTarget,
        record: &mut MetadataRecord,
    ) -> Result<(), ConnectorError> {
        let id = target.id();
        let object = self.fetch(&self.path, id).await?;
        let filled = fill_record(record, &object);
        log::debug!("{}: {} field(s) in lookup for {}", self.id, filled, id);

        let Some(detail_path) = self.detail_path.as_deref().filter(|_| target.hardworking) else {
            return Ok(());
        };
        match self.fetch(detail_path, id).await {
            Ok(detail) => {
                let mut extra = MetadataRecord::new();
                fill_record(&mut extra, &detail);
                record.merge_blanks(extra, &self.id);
            }
            Err(e) => log::debug!("{}: detail lookup skipped: {}", self.id, e),
        }
        Ok(())
    }
}

/// The one object a lookup response stands for.
fn single_object(site: &str, id: &str, body: Value) -> Result<Map<String, Value>, ConnectorError> {
    match body {
        Value::Object(object) => Ok(object),
        Value::Array(items) => {
            let mut objects: Vec<Map<String, Value>> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => Some(object),
                    _ => None,
                })
                .collect();
            match objects.len() {
                0 => Err(ConnectorError::not_found(site, id)),
                1 => Ok(objects.remove(0)),
                n => Err(ConnectorError::duplicate(site, id, n)),
            }
        }
        other => Err(ConnectorError::site(
            site,
            format!("expected a JSON object or array, got {}", json_type(&other)),
        )),
    }
}

/// Copy recognised keys into `record`. Returns how many fields were written.
fn fill_record(record: &mut MetadataRecord, object: &Map<String, Value>) -> usize {
    let mut filled = 0;
    for (name, value) in object {
        let Some(field) = Field::parse(name) else {
            continue;
        };
        let Some(value) = field_value(field.kind(), value) else {
            log::debug!("Ignoring '{}': not a {} value", name, field.kind());
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if record.set(field, value).is_ok() {
            filled += 1;
        }
    }
    filled
}

fn field_value(kind: FieldKind, value: &Value) -> Option<FieldValue> {
    match (kind, value) {
        (FieldKind::Text, Value::String(s)) => Some(FieldValue::Text(s.trim().to_string())),
        (FieldKind::Text, Value::Number(n)) => Some(FieldValue::Text(n.to_string())),
        (FieldKind::List, Value::String(s)) => Some(FieldValue::List(vec![s.trim().to_string()])),
        (FieldKind::List, Value::Array(items)) => Some(FieldValue::List(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        )),
        (FieldKind::Flag, Value::Bool(b)) => Some(FieldValue::Flag(*b)),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_body_is_used_directly() {
        let object = single_object("s", "ABC-123", json!({"title": "T"})).unwrap();
        assert_eq!(object["title"], "T");
    }

    #[test]
    fn array_body_needs_exactly_one_candidate() {
        assert!(matches!(
            single_object("s", "ABC-123", json!([])),
            Err(ConnectorError::NotFound { .. })
        ));
        assert!(matches!(
            single_object("s", "ABC-123", json!([{"title": "a"}, {"title": "b"}])),
            Err(ConnectorError::Duplicate { count: 2, .. })
        ));
        let one = single_object("s", "ABC-123", json!([{"title": "a"}])).unwrap();
        assert_eq!(one["title"], "a");
    }

    #[test]
    fn scalar_body_is_a_site_error() {
        let err = single_object("s", "ABC-123", json!("nope")).unwrap_err();
        assert!(matches!(err, ConnectorError::Site { .. }));
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn fills_known_fields_by_kind() {
        let object = json!({
            "title": " A Title ",
            "duration": 120,
            "actress": "Solo",
            "genre": ["Drama", "", 7],
            "uncensored": false,
            "cover": "",
            "unknown_key": "ignored",
            "plot": ["wrong", "kind"]
        });
        let Value::Object(object) = object else {
            unreachable!()
        };

        let mut record = MetadataRecord::new();
        assert_eq!(fill_record(&mut record, &object), 5);
        assert_eq!(record.text(Field::Title), Some("A Title"));
        assert_eq!(record.text(Field::Duration), Some("120"));
        assert_eq!(record.list(Field::Actress), Some(&["Solo".to_string()][..]));
        assert_eq!(
            record.list(Field::Genre),
            Some(&["Drama".to_string(), "7".to_string()][..])
        );
        assert_eq!(record.flag(Field::Uncensored), Some(false));
        assert!(!record.is_set(Field::Cover));
        assert!(!record.is_set(Field::Plot));
    }
}
