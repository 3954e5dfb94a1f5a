//! Coordinate normalization.
//!
//! Facts carry their position nested (`ubicacion.latitud`), flat
//! (`latitud`) or abbreviated (`lat`), as numbers or numeric strings. Each
//! coordinate is read independently in that order and the first finite
//! value wins.
use metamapa_common::{Fact, RawPosition};
use serde::Serialize;
use serde_json::Value;

/// Position used for facts without usable geodata.
pub const DEFAULT_POSITION: Coordinates = Coordinates {
    lat: -34.6,
    lng: -58.4,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn from_position(position: &RawPosition) -> Option<Self> {
        let nested = position.ubicacion.as_ref();
        let lat = first_finite([
            nested.and_then(|value| value.get("latitud")),
            position.latitud.as_ref(),
            position.lat.as_ref(),
        ])?;
        let lng = first_finite([
            nested.and_then(|value| value.get("longitud")),
            position.longitud.as_ref(),
            position.lng.as_ref(),
        ])?;
        Some(Self { lat, lng })
    }

    /// Grouping key; `-0.0` and `0.0` share a key.
    pub(crate) fn key(&self) -> (u64, u64) {
        ((self.lat + 0.0).to_bits(), (self.lng + 0.0).to_bits())
    }
}

/// Where a fact is drawn and whether the default was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub coordinates: Coordinates,
    pub defaulted: bool,
}

/// Normalize a fact's position, falling back to [`DEFAULT_POSITION`].
///
/// Runs on every view build, so it stays silent; the feed reports defaulted
/// facts once per applied snapshot.
pub fn place(fact: &Fact) -> Placement {
    match Coordinates::from_position(&fact.position) {
        Some(coordinates) => Placement {
            coordinates,
            defaulted: false,
        },
        None => Placement {
            coordinates: DEFAULT_POSITION,
            defaulted: true,
        },
    }
}

/// Read a JSON number or numeric string as a finite `f64`.
pub fn coordinate_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn first_finite<const N: usize>(candidates: [Option<&Value>; N]) -> Option<f64> {
    candidates.into_iter().flatten().find_map(coordinate_value)
}
