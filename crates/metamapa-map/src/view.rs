use crate::{MapSnapshot, Marker, format_elapsed, group_facts, render_markers};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the map page draws for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub markers: Vec<Marker>,
    /// Facts in the snapshot, counted before grouping.
    pub visible: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_label: String,
}

impl MapView {
    pub fn from_snapshot(snapshot: &MapSnapshot, now: DateTime<Utc>) -> Self {
        let groups = group_facts(&snapshot.facts);
        Self {
            markers: render_markers(&groups),
            visible: snapshot.facts.len(),
            last_updated: snapshot.last_updated,
            last_updated_label: format_elapsed(snapshot.last_updated, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use metamapa_common::Fact;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn view_counts_facts_and_groups_markers() {
        let facts: Vec<Fact> = serde_json::from_value(json!([
            { "id": 1, "latitud": -34.6, "longitud": -58.4 },
            { "id": 2, "latitud": -34.6, "longitud": -58.4 },
            { "id": 3, "lat": "-31.4", "lng": "-64.2" },
            { "id": 4, "ubicacion": { "latitud": -31.4, "longitud": -64.2 } }
        ]))
        .expect("facts");
        let now = Utc::now();
        let snapshot = MapSnapshot {
            facts: Arc::new(facts),
            last_updated: Some(now - Duration::seconds(150)),
            ..MapSnapshot::default()
        };

        let view = MapView::from_snapshot(&snapshot, now);
        assert_eq!(view.visible, 4);
        assert_eq!(view.markers.len(), 2);
        assert!(view.markers.iter().all(|marker| marker.popup.len() == 2));
        assert_eq!(view.last_updated_label, "hace 2 min");
    }

    #[test]
    fn empty_snapshot_has_no_timestamp() {
        let view = MapView::from_snapshot(&MapSnapshot::default(), Utc::now());
        assert!(view.markers.is_empty());
        assert_eq!(view.last_updated_label, "-");
    }
}
