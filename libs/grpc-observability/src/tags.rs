//! Request-scoped call tags

use std::collections::BTreeMap;

/// The field set identifying one RPC, attached to the request extensions by
/// the tagging stage and read by later stages and handlers.
#[derive(Debug, Clone, Default)]
pub struct CallTags {
    service: String,
    method: String,
    fields: BTreeMap<String, String>,
}

impl CallTags {
    /// Derive tags from a gRPC request path (`/package.Service/Method`).
    pub fn from_path(path: &str) -> Self {
        let mut parts = path.trim_start_matches('/').splitn(2, '/');
        let service = parts.next().unwrap_or_default().to_string();
        let method = parts.next().unwrap_or_default().to_string();

        Self {
            service,
            method,
            fields: BTreeMap::new(),
        }
    }

    /// Fully qualified service name (e.g. `api.DeviceService`).
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Method name (e.g. `GetDevice`).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Attach a request-derived field; later stages include it in the call
    /// log record.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Request-derived fields in stable (sorted) order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_and_method() {
        let tags = CallTags::from_path("/api.DeviceService/GetDevice");
        assert_eq!(tags.service(), "api.DeviceService");
        assert_eq!(tags.method(), "GetDevice");
    }

    #[test]
    fn tolerates_unqualified_paths() {
        let tags = CallTags::from_path("/health");
        assert_eq!(tags.service(), "health");
        assert_eq!(tags.method(), "");
    }

    #[test]
    fn custom_fields_are_sorted() {
        let mut tags = CallTags::from_path("/s/M");
        tags.insert("zone", "eu-1");
        tags.insert("application_id", "42");

        let fields: Vec<_> = tags.fields().collect();
        assert_eq!(fields, vec![("application_id", "42"), ("zone", "eu-1")]);
    }
}
