//! Paginator behavior as the menu drives it: one record per page, fresh
//! instance per render, page number carried between renders by the callback
//! payload.

use chilli_pizza_bot::paginator::{PageError, Paginator};

#[derive(Debug, Clone, PartialEq)]
struct CatalogItem {
    id: i64,
    name: &'static str,
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem { id: 1, name: "Margherita" },
        CatalogItem { id: 2, name: "Pepperoni" },
        CatalogItem { id: 3, name: "Quattro Formaggi" },
        CatalogItem { id: 4, name: "Hawaiian" },
        CatalogItem { id: 5, name: "Diavola" },
    ]
}

/// Walk the catalog forward one product at a time, the way the "next" button
/// does: every press re-fetches the collection and re-paginates at the page
/// from the callback payload.
#[test]
fn test_browse_catalog_forward_and_back() {
    let items = catalog();
    let mut page = 1;
    let mut seen = Vec::new();

    loop {
        let paginator = Paginator::new(&items, page, 1);
        assert_eq!(paginator.pages(), items.len());
        seen.extend(paginator.get_page().iter().map(|item| item.id));

        match paginator.has_next() {
            Some(next) => page = next,
            None => break,
        }
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);

    // And back again via has_previous
    let mut seen_backwards = Vec::new();
    loop {
        let paginator = Paginator::new(&items, page, 1);
        seen_backwards.extend(paginator.get_page().iter().map(|item| item.id));
        match paginator.has_previous() {
            Some(previous) => page = previous,
            None => break,
        }
    }
    assert_eq!(seen_backwards, vec![5, 4, 3, 2, 1]);
}

/// In-place navigation mutates the page and refuses to run off either end
#[test]
fn test_in_place_navigation_guards() {
    let items = catalog();
    let mut paginator = Paginator::new(&items, 1, 2);
    assert_eq!(paginator.pages(), 3);

    assert_eq!(paginator.next().unwrap().len(), 2);
    // Short last page
    assert_eq!(paginator.next().unwrap().len(), 1);
    assert_eq!(paginator.next(), Err(PageError::NoNextPage));

    assert!(paginator.previous().is_ok());
    assert!(paginator.previous().is_ok());
    assert_eq!(paginator.previous(), Err(PageError::NoPreviousPage));
}

/// A cart emptied mid-browse renders as an empty collection, not an error
#[test]
fn test_emptied_collection_is_permissive() {
    let empty: Vec<CatalogItem> = Vec::new();
    // The stale button may still carry page 3
    let paginator = Paginator::new(&empty, 3, 1);

    assert_eq!(paginator.pages(), 0);
    assert!(paginator.get_page().is_empty());
    assert_eq!(paginator.has_next(), None);
    assert_eq!(paginator.has_previous(), None);
}

/// The deliberate asymmetry: reads clamp to empty, navigation errors
#[test]
fn test_read_permissive_navigation_strict() {
    let items = catalog();

    let reader = Paginator::new(&items, 42, 1);
    assert!(reader.get_page().is_empty());

    let mut navigator = Paginator::new(&items, items.len(), 1);
    assert_eq!(navigator.has_next(), None);
    assert_eq!(navigator.next(), Err(PageError::NoNextPage));
}
