//! Filter predicates handed to the record store.
//!
//! Any "is there already a record" check must use [`Filter::for_pair`]: a
//! chauffeur can hold records for many events, so matching on the chauffeur
//! alone returns an arbitrary one of them.

use crate::adapters::schema::fields;
use crate::domain::model::StoreRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// No server-side filtering.
    All,
    /// Field equals a string, or (for linked-record fields) contains it.
    Equals { field: String, value: String },
    And(Vec<Filter>),
}

impl Filter {
    pub fn equals(field: &str, value: &str) -> Self {
        Filter::Equals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Every availability record belonging to one chauffeur.
    pub fn for_chauffeur(chauffeur_id: &str) -> Self {
        Filter::equals(fields::CHAUFFEURS, chauffeur_id)
    }

    /// The availability record (if any) for one (event, chauffeur) pair.
    pub fn for_pair(event_id: &str, chauffeur_id: &str) -> Self {
        Filter::And(vec![
            Filter::equals(fields::EVENT, event_id),
            Filter::equals(fields::CHAUFFEURS, chauffeur_id),
        ])
    }

    /// Renders the predicate as an Airtable `filterByFormula` expression.
    /// `None` means no filter should be sent.
    pub fn to_formula(&self) -> Option<String> {
        match self {
            Filter::All => None,
            Filter::Equals { field, value } => {
                Some(format!("{{{}}}={}", field.replace('}', ""), quote(value)))
            }
            Filter::And(parts) => {
                let rendered: Vec<String> = parts.iter().filter_map(Filter::to_formula).collect();
                match rendered.len() {
                    0 => None,
                    1 => rendered.into_iter().next(),
                    _ => Some(format!("AND({})", rendered.join(","))),
                }
            }
        }
    }

    /// Evaluates the predicate against a raw record, with the same semantics
    /// the remote store applies to the rendered formula.
    pub fn matches(&self, record: &StoreRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Equals { field, value } => match record.fields.get(field) {
                Some(serde_json::Value::String(s)) => s == value,
                Some(serde_json::Value::Array(items)) => {
                    items.iter().any(|item| item.as_str() == Some(value.as_str()))
                }
                _ => false,
            },
            Filter::And(parts) => parts.iter().all(|part| part.matches(record)),
        }
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn availability(id: &str, event: &str, chauffeur: &str) -> StoreRecord {
        let mut bag = HashMap::new();
        bag.insert(fields::EVENT.to_string(), json!([event]));
        bag.insert(fields::CHAUFFEURS.to_string(), json!([chauffeur]));
        bag.insert(fields::AVAILABILITY.to_string(), json!("Available"));
        StoreRecord::new(id, bag)
    }

    #[test]
    fn test_pair_filter_renders_and_formula() {
        let formula = Filter::for_pair("recE1", "recC1").to_formula().unwrap();
        assert_eq!(formula, "AND({Event}='recE1',{Chauffeurs}='recC1')");
    }

    #[test]
    fn test_chauffeur_filter_renders_single_equality() {
        let formula = Filter::for_chauffeur("recC1").to_formula().unwrap();
        assert_eq!(formula, "{Chauffeurs}='recC1'");
    }

    #[test]
    fn test_all_renders_no_formula() {
        assert_eq!(Filter::All.to_formula(), None);
        assert_eq!(Filter::And(vec![Filter::All]).to_formula(), None);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let formula = Filter::for_chauffeur("x' OR '1'='1").to_formula().unwrap();
        assert_eq!(formula, r"{Chauffeurs}='x\' OR \'1\'=\'1'");
    }

    #[test]
    fn test_pair_filter_does_not_match_other_events() {
        let e1 = availability("r1", "e1", "c1");
        let e2 = availability("r2", "e2", "c1");

        let pair = Filter::for_pair("e2", "c1");
        assert!(!pair.matches(&e1));
        assert!(pair.matches(&e2));

        let chauffeur_only = Filter::for_chauffeur("c1");
        assert!(chauffeur_only.matches(&e1));
        assert!(chauffeur_only.matches(&e2));
    }
}
