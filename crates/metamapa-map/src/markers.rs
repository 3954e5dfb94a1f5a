//! Marker and popup rendering.
//!
//! One marker per [`MarkerGroup`], coloured after the group's first member.
//! The popup lists every member with its detail and report actions.
use crate::{Coordinates, MarkerGroup};
use metamapa_common::Fact;
use metamapa_common::ids::FactId;
use serde::Serialize;

const DEFAULT_TITLE: &str = "Hecho";
const DETAIL_LABEL: &str = "Detalle";
const REPORT_LABEL: &str = "Reportar";
const REPORT_PATH: &str = "/solicitudes/nueva";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    #[default]
    Verde,
    Naranja,
    Rojo,
}

impl MarkerColor {
    /// Unknown or missing colours fall back to green.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("naranja") => Self::Naranja,
            Some("rojo") => Self::Rojo,
            _ => Self::Verde,
        }
    }
}

/// State handed to the removal-request form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub hecho_id: Option<FactId>,
    pub titulo_hecho: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupAction {
    pub label: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<NavigationState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupEntry {
    pub id: Option<FactId>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub actions: Vec<PopupAction>,
}

impl PopupEntry {
    pub fn from_fact(fact: &Fact) -> Self {
        let title = capitalize(fact.title.as_deref().unwrap_or(""));
        let mut actions = Vec::with_capacity(2);
        if let Some(id) = &fact.id {
            actions.push(PopupAction {
                label: DETAIL_LABEL,
                path: format!("/hechos/{id}"),
                state: None,
            });
        }
        actions.push(PopupAction {
            label: REPORT_LABEL,
            path: REPORT_PATH.to_string(),
            state: Some(NavigationState {
                hecho_id: fact.id.clone(),
                titulo_hecho: fact.title.clone(),
            }),
        });

        Self {
            id: fact.id.clone(),
            title: if title.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title
            },
            description: fact
                .description
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string),
            category: capitalize(fact.category.as_deref().unwrap_or("")),
            actions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: Coordinates,
    pub color: MarkerColor,
    pub popup: Vec<PopupEntry>,
}

pub fn render_markers(groups: &[MarkerGroup]) -> Vec<Marker> {
    groups
        .iter()
        .map(|group| Marker {
            position: group.position,
            color: MarkerColor::from_label(group.lead().color.as_deref()),
            popup: group.facts.iter().map(PopupEntry::from_fact).collect(),
        })
        .collect()
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
