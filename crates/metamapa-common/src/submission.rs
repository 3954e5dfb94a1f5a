// New-fact submissions: the form payload, its validation, and attachments.
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Form payload sent by the fact creation page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFactRequest {
    #[serde(default)]
    pub titulo: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub categoria: String,
    #[serde(default)]
    pub etiquetas: Vec<String>,
    pub fecha: Option<NaiveDate>,
    #[serde(default)]
    pub hora: Option<String>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
}

/// Descriptor serialized into the `hecho` multipart field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFact {
    pub titulo: String,
    pub descripcion: String,
    pub categoria: String,
    pub etiquetas: Vec<String>,
    pub fecha_hecho: String,
    pub latitud: f64,
    pub longitud: f64,
}

impl NewFactRequest {
    /// Validate the form and build the wire descriptor.
    ///
    /// The occurrence time defaults to midnight; tags are trimmed and
    /// deduplicated in submission order.
    pub fn into_descriptor(self) -> Result<NewFact> {
        // The location comes from a map click; both coordinates are required.
        let (latitud, longitud) = match (self.latitud, self.longitud) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => (lat, lng),
            _ => return Err(Error::MissingField("ubicacion")),
        };
        if !(-90.0..=90.0).contains(&latitud) || !(-180.0..=180.0).contains(&longitud) {
            return Err(Error::InvalidField {
                field: "ubicacion",
                reason: format!("coordinates out of range: {latitud}, {longitud}"),
            });
        }
        let fecha = self.fecha.ok_or(Error::MissingField("fecha"))?;
        let hora = match self.hora.as_deref().map(str::trim) {
            None | Some("") => NaiveTime::MIN,
            Some(value) => NaiveTime::parse_from_str(value, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
                .map_err(|err| Error::InvalidField {
                    field: "hora",
                    reason: err.to_string(),
                })?,
        };
        let titulo = self.titulo.trim().to_string();
        if titulo.is_empty() {
            return Err(Error::MissingField("titulo"));
        }

        let mut etiquetas: Vec<String> = Vec::with_capacity(self.etiquetas.len());
        for tag in self.etiquetas {
            let tag = tag.trim();
            if !tag.is_empty() && !etiquetas.iter().any(|seen| seen == tag) {
                etiquetas.push(tag.to_string());
            }
        }

        Ok(NewFact {
            titulo,
            descripcion: self.descripcion.trim().to_string(),
            categoria: self.categoria.trim().to_string(),
            etiquetas,
            fecha_hecho: format!("{}T{}:00", fecha.format("%Y-%m-%d"), hora.format("%H:%M")),
            latitud,
            longitud,
        })
    }
}

/// A file part forwarded to the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Fact media is limited to images and videos.
    pub fn is_media(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.starts_with("image/") || content_type.starts_with("video/")
    }

    /// Dataset uploads must be CSV files.
    pub fn is_csv(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".csv")
    }
}
