use super::*;

fn page(id: &str, page_type: &str, url: &str) -> PageInfo {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "type": page_type,
        "title": "t",
        "url": url,
    }))
    .unwrap()
}

#[test]
fn test_first_matching_page_wins() {
    let config = DriverConfig::default();
    let pages = vec![
        page("A", "page", "https://example.com/"),
        page("B", "page", "https://chatgpt.com/c/1"),
        page("C", "page", "https://claude.ai/new"),
    ];
    let target = first_matching_page(&config, &pages).unwrap();
    assert_eq!(target.target_id, "B");
    assert_eq!(target.url, "https://chatgpt.com/c/1");
}

#[test]
fn test_non_page_targets_skipped() {
    let config = DriverConfig::default();
    let pages = vec![
        page("W", "service_worker", "https://chatgpt.com/sw.js"),
        page("I", "iframe", "https://chatgpt.com/frame"),
    ];
    assert!(first_matching_page(&config, &pages).is_none());
}

#[test]
fn test_no_match_returns_none() {
    let config = DriverConfig::default();
    let pages = vec![page("A", "page", "https://news.ycombinator.com/")];
    assert!(first_matching_page(&config, &pages).is_none());
}

#[test]
fn test_empty_page_list() {
    let config = DriverConfig::default();
    assert!(first_matching_page(&config, &[]).is_none());
}
