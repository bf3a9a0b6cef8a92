//! `ServiceKey`: the `(name, tags, dc)` triple identifying a discovery query.

use crate::error::DiscoveryError;

/// Identifies a discovery query by service name, an ordered set of tags
/// (joined with `:`), and an optional datacenter.
///
/// Serializes as `[<tags>.]<name>.service[.<dc>]`; [`ServiceKey::parse`] is the
/// inverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub name: String,
    pub tags: String,
    pub dc: String,
}

impl ServiceKey {
    /// Build a key from a name, an ordered tag list, and a datacenter.
    pub fn new(name: impl Into<String>, tags: &[String], dc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: tags.join(":"),
            dc: dc.into(),
        }
    }

    /// Parse a wire/disk key of the form `[<tags>.]<name>.service[.<dc>]`.
    ///
    /// Fails with [`DiscoveryError::Argument`] if the literal token `service`
    /// is absent or is the very first field (there is no room for a name
    /// before it).
    pub fn parse(key: &str) -> Result<Self, DiscoveryError> {
        let fields: Vec<&str> = key.split('.').collect();

        let idx = fields.iter().position(|f| *f == "service");
        let idx = match idx {
            Some(idx) if idx >= 1 => idx,
            _ => {
                return Err(DiscoveryError::Argument(format!(
                    "service key {key:?} is missing a valid \"service\" token"
                )));
            }
        };

        let name = fields[idx - 1].to_string();
        let tags = if idx - 1 > 0 {
            fields[..idx - 1].join(".")
        } else {
            String::new()
        };
        let dc = if idx + 1 < fields.len() {
            fields[idx + 1..].join(".")
        } else {
            String::new()
        };

        Ok(Self { name, tags, dc })
    }

    /// The `:`-joined `tags` field, split back into its component list.
    pub fn tags_vec(&self) -> Vec<String> {
        if self.tags.is_empty() {
            Vec::new()
        } else {
            self.tags.split(':').map(str::to_string).collect()
        }
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields = Vec::new();
        if !self.tags.is_empty() {
            fields.push(self.tags.as_str());
        }
        fields.push(self.name.as_str());
        fields.push("service");
        if !self.dc.is_empty() {
            fields.push(self.dc.as_str());
        }
        write!(f, "{}", fields.join("."))
    }
}
