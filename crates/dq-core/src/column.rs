//! Column descriptors handed to the rendering collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Date,
}

/// How a field should be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub field: String,
    #[serde(alias = "headerName", alias = "headerLabel")]
    pub header_label: String,
    #[serde(default)]
    pub kind: ColumnKind,
    #[serde(
        default,
        alias = "maxWidth",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_width: Option<u32>,
}

impl ColumnDescriptor {
    pub fn new(field: impl Into<String>, header_label: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            field: field.into(),
            header_label: header_label.into(),
            kind,
            max_width: None,
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width);
        self
    }
}

/// Header label configured for `field`, or the raw field name.
pub fn label_for<'a>(columns: &'a [ColumnDescriptor], field: &'a str) -> &'a str {
    columns
        .iter()
        .find(|c| c.field == field)
        .map(|c| c.header_label.as_str())
        .unwrap_or(field)
}
