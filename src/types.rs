use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ContentId(pub i64);

/// Normalized catalog entry. The provider splits movies and series across
/// title/name and release_date/first_air_date; normalization resolves both
/// pairs up front so consumers never have to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: ContentId,
    pub display_name: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: f64,
    pub display_date: Option<NaiveDate>,
    pub is_series: bool,
}

/// Insertion-ordered set of content keyed by id. Lives for one process
/// lifetime only.
#[derive(Default)]
pub struct Watchlist {
    items: Vec<ContentItem>,
}

impl Watchlist {
    pub fn new() -> Watchlist {
        Watchlist::default()
    }

    /// Adds the item if absent, removes it if present. Returns true if the
    /// item is in the list after the call.
    pub fn toggle(&mut self, item: ContentItem) -> bool {
        match self.items.iter().position(|i| i.id == item.id) {
            Some(idx) => {
                self.items.remove(idx);
                false
            }
            None => {
                self.items.push(item);
                true
            }
        }
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.items.iter().any(|i| i.id == *id)
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn item(id: i64, name: &str) -> ContentItem {
        ContentItem {
            id: ContentId(id),
            display_name: name.to_string(),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            vote_average: 7.0,
            display_date: None,
            is_series: false,
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut list = Watchlist::new();
        assert!(list.toggle(item(1, "a")));
        assert!(list.contains(&ContentId(1)));
        assert!(!list.toggle(item(1, "a")));
        assert!(!list.contains(&ContentId(1)));
        assert!(list.items().is_empty());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut list = Watchlist::new();
        list.toggle(item(3, "c"));
        list.toggle(item(1, "a"));
        list.toggle(item(2, "b"));
        let ids: Vec<i64> = list.items().iter().map(|i| i.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        list.toggle(item(1, "a"));
        let ids: Vec<i64> = list.items().iter().map(|i| i.id.0).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
