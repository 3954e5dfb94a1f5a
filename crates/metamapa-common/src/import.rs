// Dataset import results and history entries.
use crate::serde_helpers::{null_as_default, text_or_none};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one dataset upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    #[serde(default)]
    pub exitoso: bool,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub archivo_id: Option<i64>,
    #[serde(default)]
    pub procesadas: u64,
    #[serde(default)]
    pub insertadas: u64,
    #[serde(default)]
    pub reemplazadas: u64,
    #[serde(default)]
    pub salteadas: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errores: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Exitoso,
    Fallido,
}

/// A previous import run as listed by the history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRun {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub nombre_archivo: String,
    #[serde(default, deserialize_with = "text_or_none")]
    pub fecha_carga: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filas_procesadas: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hecho_insertados: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hechos_reemplazados: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filas_salteadas: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errores: Vec<String>,
}

impl ImportRun {
    pub fn outcome(&self) -> ImportOutcome {
        match self.estado.as_deref() {
            Some("PROCESADO") => ImportOutcome::Exitoso,
            _ => ImportOutcome::Fallido,
        }
    }
}
