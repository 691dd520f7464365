use std::fmt;
use std::sync::Arc;

use crate::index::FilterableItem;

/// Aggregate counts over a filter result. Enums contribute the flags of their
/// items, members their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub unreplicated: usize,
    pub deprecated: usize,
    pub hidden: usize,
    pub unscriptable: usize,
}

impl Stats {
    fn tally(&mut self, unreplicated: bool, deprecated: bool, hidden: bool, unscriptable: bool) {
        self.unreplicated += usize::from(unreplicated);
        self.deprecated += usize::from(deprecated);
        self.hidden += usize::from(hidden);
        self.unscriptable += usize::from(unscriptable);
    }

    pub fn calculate(items: &[Arc<FilterableItem>]) -> Self {
        let mut stats = Stats { total: items.len(), ..Stats::default() };
        for item in items {
            match &**item {
                FilterableItem::Member(m) => stats.tally(m.unreplicated, m.deprecated, m.hidden, m.unscriptable),
                FilterableItem::Enum(e) => {
                    for i in &e.enum_items {
                        stats.tally(i.unreplicated, i.deprecated, i.hidden, i.unscriptable);
                    }
                }
            }
        }
        stats
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Total Results: {} | Unreplicated: {} | Deprecated: {} | Hidden: {} | Unscriptable: {}",
            self.total, self.unreplicated, self.deprecated, self.hidden, self.unscriptable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::from_json_str;
    use crate::index::index;

    #[test]
    fn enums_count_their_items() {
        let dataset = from_json_str(
            r#"{"classes": [{"name": "Part", "members": [
                {"name": "A", "member_type": "Property", "deprecated": true, "hidden": true},
                {"name": "B", "member_type": "Event", "unreplicated": true}
            ]}], "enums": [{"name": "Color", "items": [
                {"name": "Red", "value": 0, "deprecated": true},
                {"name": "Blue", "value": 1, "deprecated": true, "unscriptable": true}
            ]}]}"#,
        )
        .unwrap();
        let items: Vec<_> = index(&dataset).iter().cloned().collect();
        let stats = Stats::calculate(&items);
        assert_eq!(
            stats,
            Stats { total: 3, unreplicated: 1, deprecated: 3, hidden: 1, unscriptable: 1 }
        );
        assert!(stats.to_string().starts_with("Total Results: 3 |"));
    }
}
