use crate::coords::{Coordinates, place};
use metamapa_common::Fact;
use std::collections::HashMap;

/// Facts drawn at one exact coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub position: Coordinates,
    pub facts: Vec<Fact>,
}

impl MarkerGroup {
    /// The member that decides the marker's colour.
    pub fn lead(&self) -> &Fact {
        // Groups are only created with a first member.
        &self.facts[0]
    }
}

/// Group facts by exact normalized coordinate.
///
/// Groups appear in the order their first member was encountered, and members
/// keep their input order.
pub fn group_facts(facts: &[Fact]) -> Vec<MarkerGroup> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut groups: Vec<MarkerGroup> = Vec::new();
    for fact in facts {
        let position = place(fact).coordinates;
        match index.get(&position.key()) {
            Some(slot) => groups[*slot].facts.push(fact.clone()),
            None => {
                index.insert(position.key(), groups.len());
                groups.push(MarkerGroup {
                    position,
                    facts: vec![fact.clone()],
                });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fact(id: u32, lat: f64, lng: f64) -> Fact {
        serde_json::from_value(json!({ "id": id, "latitud": lat, "longitud": lng })).expect("fact")
    }

    fn ids(group: &MarkerGroup) -> Vec<String> {
        group
            .facts
            .iter()
            .filter_map(|fact| fact.id.as_ref().map(|id| id.to_string()))
            .collect()
    }

    #[test]
    fn two_locations_make_two_groups() {
        let facts = vec![
            fact(1, -34.6, -58.4),
            fact(2, -31.4, -64.2),
            fact(3, -34.6, -58.4),
            fact(4, -31.4, -64.2),
        ];
        let groups = group_facts(&facts);
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[0]), vec!["1", "3"]);
        assert_eq!(ids(&groups[1]), vec!["2", "4"]);
        assert_eq!(groups[1].position, Coordinates { lat: -31.4, lng: -64.2 });
    }

    #[test]
    fn nearby_points_are_not_merged() {
        let facts = vec![fact(1, -34.6, -58.4), fact(2, -34.600001, -58.4)];
        assert_eq!(group_facts(&facts).len(), 2);
    }

    #[test]
    fn facts_without_geodata_join_the_default_group() {
        let missing: Fact = serde_json::from_value(json!({ "id": 9 })).expect("fact");
        let facts = vec![fact(1, -34.6, -58.4), missing];
        let groups = group_facts(&facts);
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["1", "9"]);
    }

    #[test]
    fn grouping_is_idempotent() {
        let facts = vec![
            fact(1, 1.0, 1.0),
            fact(2, 2.0, 2.0),
            fact(3, 1.0, 1.0),
            fact(4, 3.0, 3.0),
            fact(5, 2.0, 2.0),
        ];
        let first = group_facts(&facts);
        let flattened: Vec<Fact> = first.iter().flat_map(|group| group.facts.clone()).collect();
        let second = group_facts(&flattened);
        assert_eq!(first, second);
    }

    #[test]
    fn lead_is_first_member() {
        let groups = group_facts(&[fact(7, 0.0, 0.0), fact(8, -0.0, 0.0)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].lead().id.as_ref().map(|id| id.as_str()), Some("7"));
    }
}
