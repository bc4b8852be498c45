//! Property-based tests using proptest
//!
//! These tests verify sort parsing, page size clamping, page request
//! building and cursor bookkeeping using randomized inputs.

use jamf_collections::resource::paging::{
    clamp_page_size, normalize_filter, PageRequest, PagingCursors, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};
use jamf_collections::{Sort, SortDirection};
use proptest::prelude::*;

/// Generate a valid sort criterion
fn arb_sort_token() -> impl Strategy<Value = String> {
    (
        "[a-zA-Z][a-zA-Z0-9.]{0,20}",
        prop_oneof!["asc", "desc", "ASC", "Desc"],
    )
        .prop_map(|(field, dir)| format!("{}:{}", field, dir))
}

fn arb_sort_tokens() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_sort_token(), 0..6)
}

proptest! {
    /// Page size always lands inside the accepted range
    #[test]
    fn page_size_is_clamped(size in proptest::option::of(any::<u32>())) {
        let clamped = clamp_page_size(size);
        prop_assert!((MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&clamped));
        if let Some(size) = size {
            if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) {
                prop_assert_eq!(clamped, size);
            }
        }
    }

    /// A token list and its comma-joined form describe the same sort
    #[test]
    fn joined_and_split_sorts_are_equal(tokens in arb_sort_tokens()) {
        let from_tokens = Sort::parse(&tokens).unwrap();
        let joined: Sort = tokens.join(",").parse().unwrap();
        prop_assert_eq!(&from_tokens, &joined);
        prop_assert_eq!(from_tokens.is_empty(), tokens.is_empty());
    }

    /// Tokens are passed through exactly as given
    #[test]
    fn sort_query_preserves_tokens(tokens in arb_sort_tokens()) {
        let sort = Sort::parse(&tokens).unwrap();
        match sort.to_query() {
            Some(query) => prop_assert_eq!(query, tokens.join(",")),
            None => prop_assert!(tokens.is_empty()),
        }
    }

    /// Anything without a valid direction is rejected
    #[test]
    fn bad_direction_is_rejected(
        field in "[a-z]{1,10}",
        dir in "[a-z]{1,6}".prop_filter("not a direction", |d| d != "asc" && d != "desc")
    ) {
        let token = format!("{}:{}", field, dir);
        prop_assert!(token.parse::<Sort>().is_err());
    }

    /// Blank filters normalize away, others are trimmed but otherwise untouched
    #[test]
    fn filter_normalization(filter in ".{0,40}") {
        match normalize_filter(Some(&filter)) {
            Some(normalized) => prop_assert_eq!(normalized, filter.trim()),
            None => prop_assert!(filter.trim().is_empty()),
        }
    }

    /// Advancing a cursor n times lands on page n with the starting parameters
    #[test]
    fn cursor_advances_one_page_at_a_time(
        size in 1u32..=2000,
        steps in 0usize..20,
        field in "[a-z]{1,8}"
    ) {
        let sort = Sort::new().by(&field, SortDirection::Desc).to_query();
        let first = PageRequest::first("v1/departments", size, sort.clone(), None);
        let mut cursors = PagingCursors::default();
        cursors.start("departments", first);

        let mut last = None;
        for _ in 0..steps {
            last = cursors.advance("departments");
        }

        if let Some(request) = last {
            prop_assert_eq!(request.page as usize, steps);
            prop_assert_eq!(request.page_size, size);
            prop_assert_eq!(request.sort, sort);
        } else {
            prop_assert_eq!(steps, 0);
        }
    }

    /// The page query always carries page and page-size
    #[test]
    fn page_path_has_paging_params(page in 0u32..1000, size in 1u32..=2000) {
        let mut request = PageRequest::first("v1/scripts", size, None, None);
        request.page = page;
        let path = request.path();
        let expected = format!("page={}&page-size={}", page, size);
        prop_assert!(path.starts_with("v1/scripts?"));
        prop_assert!(path.contains(&expected));
    }
}
