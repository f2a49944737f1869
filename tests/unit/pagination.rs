use chrono::NaiveDate;
use newsfeed_archiver::fetcher::pagination::{PageCursor, PageOutcome, DEFAULT_PAGE_SIZE, MAX_PAGES};
use newsfeed_archiver::fetcher::PageRequest;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 3, 14).unwrap()
}

#[test]
fn test_defaults_match_api_limits() {
    assert_eq!(DEFAULT_PAGE_SIZE, 100);
    assert_eq!(MAX_PAGES, 1000);
}

#[test]
fn test_k_full_pages_then_short_page_requests_k_plus_one() {
    let mut cursor = PageCursor::new(PageRequest::first(day(), DEFAULT_PAGE_SIZE), MAX_PAGES);
    let sizes = [100, 100, 100, 37];
    let mut requested = Vec::new();

    for size in sizes {
        let request = cursor.next_request().expect("cursor ended early");
        requested.push(request.page);
        cursor.advance(size);
    }

    assert_eq!(requested, vec![0, 1, 2, 3]);
    assert!(cursor.next_request().is_none());
    assert_eq!(cursor.items_seen(), 337);
    assert_eq!(cursor.pages_fetched(), 4);
}

#[test]
fn test_page_ceiling_stops_full_pages() {
    let mut cursor = PageCursor::new(PageRequest::first(day(), 1), MAX_PAGES);
    let mut last = PageOutcome::Continue;
    let mut fetched = 0;

    while cursor.next_request().is_some() {
        last = cursor.advance(1);
        fetched += 1;
    }

    assert_eq!(fetched, MAX_PAGES);
    assert_eq!(last, PageOutcome::PageCapReached);
    assert!(cursor.is_finished());
}

#[test]
fn test_requests_keep_day_and_sort_settings() {
    let mut cursor = PageCursor::new(PageRequest::first(day(), 5).with_page(7), 10);

    let first = cursor.next_request().unwrap();
    assert_eq!(first.page, 0);
    cursor.advance(5);
    let second = cursor.next_request().unwrap();

    assert_eq!(second.date, day());
    assert_eq!(second.page_size, 5);
    assert_eq!(second.sort_field, first.sort_field);
    assert_eq!(second.page, 1);
}
