//! Map filter criteria.
//!
//! A [`FilterCriteria`] is owned by whoever hosts the map and handed to each
//! fetch cycle as an immutable snapshot. It is hashable so identical filter
//! sets can share one polling feed.
use crate::serde_helpers::empty_as_none;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Navigation mode over the fact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisibilityMode {
    /// Every fact that passed moderation.
    #[serde(rename = "IRRESTRICTA", alias = "IRRESTRICTO")]
    Unrestricted,
    /// Only facts that reached consensus across sources.
    #[serde(rename = "CURADA", alias = "CURADO")]
    Curated,
}

impl VisibilityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityMode::Unrestricted => "IRRESTRICTA",
            VisibilityMode::Curated => "CURADA",
        }
    }
}

impl fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IRRESTRICTA" | "IRRESTRICTO" => Ok(VisibilityMode::Unrestricted),
            "CURADA" | "CURADO" => Ok(VisibilityMode::Curated),
            other => Err(format!("unknown visibility mode: {other}")),
        }
    }
}

/// Filters applied to the fact read endpoint.
///
/// Empty strings coming from form inputs deserialize as `None` so that an
/// untouched field never reaches the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub categoria: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub desde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub hasta: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub ubicacion: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub modo: Option<VisibilityMode>,
}

impl FilterCriteria {
    /// Query parameters for the read endpoint, omitting unset fields.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(value) = non_blank(self.categoria.as_deref()) {
            pairs.push(("categoria", value.to_string()));
        }
        if let Some(value) = self.desde {
            pairs.push(("desde", value.format("%Y-%m-%d").to_string()));
        }
        if let Some(value) = self.hasta {
            pairs.push(("hasta", value.format("%Y-%m-%d").to_string()));
        }
        if let Some(value) = non_blank(self.ubicacion.as_deref()) {
            pairs.push(("ubicacion", value.to_string()));
        }
        if let Some(value) = self.modo {
            pairs.push(("modo", value.as_str().to_string()));
        }
        pairs
    }

    pub fn is_unfiltered(&self) -> bool {
        self.query_pairs().is_empty()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
