//! Page and file reorder list
//!
//! Items carry a stable id so a client can reconcile its list after a drag,
//! independent of the item's current position.

use crate::api::DocumentId;
use crate::error::{Error, Result};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Move the element at `from` so it ends up at index `to`.
///
/// Remove-then-insert splice; the input is left untouched.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Result<Vec<T>> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(Error::InvalidMove { from, to, len });
    }
    let mut out = items.to_vec();
    let item = out.remove(from);
    out.insert(to, item);
    Ok(out)
}

/// One entry of the reorder list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageOrderItem {
    /// Stable identifier, unchanged by reordering
    pub id: String,
    /// 1-based page number within its source; absent for whole-file entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Index of the source file this entry came from
    pub source_index: usize,
    /// 1-based position in the current order
    pub position: u32,
}

/// A single reorder instruction from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MoveRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOrder {
    items: Vec<PageOrderItem>,
    #[serde(skip)]
    initial: Vec<PageOrderItem>,
}

impl PageOrder {
    fn from_items(mut items: Vec<PageOrderItem>) -> Self {
        renumber(&mut items);
        Self {
            initial: items.clone(),
            items,
        }
    }

    /// Pages of a single document in reading order
    pub fn for_pages(page_count: u32) -> Self {
        Self::for_sources(&[page_count])
    }

    /// Pages of several documents, source by source
    pub fn for_sources(page_counts: &[u32]) -> Self {
        let items = page_counts
            .iter()
            .enumerate()
            .flat_map(|(source, &count)| {
                (1..=count).map(move |page| PageOrderItem {
                    id: format!("{}-{}", source, page),
                    page_number: Some(page),
                    source_index: source,
                    position: 0,
                })
            })
            .collect();
        Self::from_items(items)
    }

    /// Whole files in upload order (merge)
    pub fn for_files(file_count: usize) -> Self {
        let items = (0..file_count)
            .map(|source| PageOrderItem {
                id: format!("file-{}", source),
                page_number: None,
                source_index: source,
                position: 0,
            })
            .collect();
        Self::from_items(items)
    }

    pub fn items(&self) -> &[PageOrderItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let mut items = move_item(&self.items, from, to)?;
        renumber(&mut items);
        self.items = items;
        Ok(())
    }

    /// Move the item with the given stable id to index `to`
    pub fn move_by_id(&mut self, id: &str, to: usize) -> Result<()> {
        let from = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| Error::InvalidOption {
                name: "id".to_string(),
                reason: format!("no item with id {}", id),
            })?;
        self.move_item(from, to)
    }

    /// Drop an item from the order (it comes back on reset)
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Err(Error::InvalidOption {
                name: "id".to_string(),
                reason: format!("no item with id {}", id),
            });
        }
        renumber(&mut self.items);
        Ok(())
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
        renumber(&mut self.items);
    }

    /// Restore upload order, including removed items
    pub fn reset(&mut self) {
        self.items = self.initial.clone();
    }

    /// Page numbers in current order, the payload of an organize call
    pub fn page_order(&self) -> Vec<u32> {
        self.items.iter().filter_map(|item| item.page_number).collect()
    }

    /// Source indices in current order
    pub fn source_order(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.source_index).collect()
    }

    /// Document ids in current order, the payload of a merge call.
    ///
    /// Entries whose source index has no document are skipped.
    pub fn document_ids(&self, documents: &[DocumentId]) -> Vec<DocumentId> {
        self.items
            .iter()
            .filter_map(|item| documents.get(item.source_index).cloned())
            .collect()
    }
}

fn renumber(items: &mut [PageOrderItem]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.position = index as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_move_item_pure() {
        let list = vec!['A', 'B', 'C'];
        let moved = move_item(&list, 2, 0).unwrap();
        assert_eq!(moved, vec!['C', 'A', 'B']);
        assert_eq!(list, vec!['A', 'B', 'C']);
    }

    #[test]
    fn test_move_item_forward() {
        let moved = move_item(&[1, 2, 3, 4], 0, 2).unwrap();
        assert_eq!(moved, vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let result = move_item(&[1, 2, 3], 3, 0);
        assert!(matches!(
            result,
            Err(Error::InvalidMove {
                from: 3,
                to: 0,
                len: 3
            })
        ));
        assert!(move_item::<u8>(&[], 0, 0).is_err());
    }

    #[test]
    fn test_move_renumbers_positions() {
        let mut order = PageOrder::for_pages(3);
        order.move_item(2, 0).unwrap();
        assert_eq!(order.page_order(), vec![3, 1, 2]);
        let positions: Vec<u32> = order.items().iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(order.items()[0].id, "0-3");
    }

    #[test]
    fn test_reverse_and_reset() {
        let mut order = PageOrder::for_pages(4);
        order.reverse();
        assert_eq!(order.page_order(), vec![4, 3, 2, 1]);
        let positions: Vec<u32> = order.items().iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);

        order.remove("0-2").unwrap();
        assert_eq!(order.page_order(), vec![4, 3, 1]);
        order.reset();
        assert_eq!(order.page_order(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_move_by_id() {
        let mut order = PageOrder::for_pages(5);
        order.move_by_id("0-5", 1).unwrap();
        assert_eq!(order.page_order(), vec![1, 5, 2, 3, 4]);
        assert!(order.move_by_id("9-9", 0).is_err());
    }

    #[test]
    fn test_for_sources_ids_unique() {
        let order = PageOrder::for_sources(&[2, 2]);
        let ids: Vec<&str> = order.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["0-1", "0-2", "1-1", "1-2"]);
        assert_eq!(order.source_order(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_document_ids_follow_order() {
        let docs = vec![
            DocumentId::from("11"),
            DocumentId::from("12"),
            DocumentId::from("13"),
        ];
        let mut order = PageOrder::for_files(3);
        order.move_item(0, 2).unwrap();
        assert_eq!(
            order.document_ids(&docs),
            vec![
                DocumentId::from("12"),
                DocumentId::from("13"),
                DocumentId::from("11")
            ]
        );
        assert!(order.page_order().is_empty());
    }
}
