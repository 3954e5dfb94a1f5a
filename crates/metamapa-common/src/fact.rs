//! Fact (hecho) records as served by the fact read endpoint.
//!
//! # Purpose
//! Decodes the heterogeneous fact payloads produced by the different fact
//! sources without failing the whole list on one malformed record.
//!
//! # Key invariants
//! - Position fields are kept raw; numeric coercion happens in the map crate.
//! - Unknown moderation states decode as [`ModerationStatus::Unknown`].
//! - Dates that do not parse are kept as text and reported as `None` by the
//!   typed accessors.
use crate::ids::FactId;
use crate::serde_helpers::{null_as_default, text_or_none};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Moderation state of a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    Pendiente,
    Aceptado,
    AceptadoConSugerencias,
    Rechazado,
    #[serde(other)]
    Unknown,
}

impl ModerationStatus {
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            ModerationStatus::Aceptado | ModerationStatus::AceptadoConSugerencias
        )
    }
}

/// Media attached to a fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "tipo")]
    pub kind: Option<String>,
    #[serde(default, rename = "formato")]
    pub format: Option<String>,
}

/// Every position representation a source may send.
///
/// Values stay as raw JSON because sources disagree on numbers versus
/// numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ubicacion: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitud: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitud: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<Value>,
}

/// A geotagged fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(default)]
    pub id: Option<FactId>,
    #[serde(default, rename = "titulo")]
    pub title: Option<String>,
    #[serde(default, rename = "descripcion")]
    pub description: Option<String>,
    #[serde(default, rename = "categoria")]
    pub category: Option<String>,
    #[serde(default, rename = "etiquetas", deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, rename = "fechaHecho", deserialize_with = "text_or_none")]
    pub occurred_at_raw: Option<String>,
    #[serde(default, rename = "fechaCarga", deserialize_with = "text_or_none")]
    pub uploaded_at_raw: Option<String>,
    #[serde(flatten)]
    pub position: RawPosition,
    #[serde(
        default,
        rename = "multimedias",
        alias = "multimedia",
        deserialize_with = "null_as_default"
    )]
    pub media: Vec<MediaAttachment>,
    #[serde(default, rename = "estadoRevision", alias = "estado")]
    pub status: Option<ModerationStatus>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Fact {
    pub fn occurred_at(&self) -> Option<NaiveDateTime> {
        self.occurred_at_raw.as_deref().and_then(parse_local_datetime)
    }

    pub fn uploaded_at(&self) -> Option<NaiveDateTime> {
        self.uploaded_at_raw.as_deref().and_then(parse_local_datetime)
    }

    /// Short label used in diagnostics: `"title" (ID: id)`.
    pub fn label(&self) -> String {
        let id = self
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("\"{}\" (ID: {id})", self.title.as_deref().unwrap_or(""))
    }
}

fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
