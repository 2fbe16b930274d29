//! End-to-end search against a mock backend.

use std::time::Duration;

use mockito::{Matcher, Server};
use unibites_integration_tests::{CART_PAGE, config_for, messages, storefront};
use unibites_storefront::search::SearchOutcome;
use unibites_storefront::view::NO_RESULTS_MESSAGE;
use unibites_storefront::{EventOutcome, UiEvent};

const PIZZAS: &str = r#"{"results": [
    {"id": 1, "name": "Pizza A", "description": "Margherita", "price": 199, "image_url": "/media/a.jpg"},
    {"id": 2, "name": "Pizza B", "description": "Farmhouse", "price": "249.00", "image_url": null}
]}"#;

#[tokio::test]
async fn test_submit_renders_result_cards() {
    let mut server = Server::new_async().await;
    let search = server
        .mock("GET", "/api/search")
        .match_query(Matcher::UrlEncoded("q".into(), "piz".into()))
        .match_header("x-csrftoken", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PIZZAS)
        .create_async()
        .await;

    let shop = storefront(config_for(&server), CART_PAGE, true);
    let outcome = shop.dispatch(UiEvent::SearchSubmit("piz".into())).await;

    search.assert_async().await;
    assert!(matches!(
        outcome,
        EventOutcome::Search(SearchOutcome::Rendered { results: 2, .. })
    ));
    let rendered = shop.page().search_results().expect("results rendered");
    assert!(!rendered.is_placeholder());
    let cards: Vec<_> = rendered
        .cards
        .iter()
        .map(|c| (c.name.as_str(), c.price.as_str()))
        .collect();
    assert_eq!(cards, vec![("Pizza A", "₹199"), ("Pizza B", "₹249")]);
    assert!(rendered.html.contains("/static/images/default-food.jpg"));
    assert!(!rendered.html.contains(NO_RESULTS_MESSAGE));
}

#[tokio::test]
async fn test_query_is_percent_encoded() {
    let mut server = Server::new_async().await;
    let search = server
        .mock("GET", "/api/search")
        .match_query(Matcher::UrlEncoded("q".into(), "dal & rice".into()))
        .with_status(200)
        .with_body(r#"{"results": []}"#)
        .create_async()
        .await;

    let shop = storefront(config_for(&server), CART_PAGE, true);
    shop.dispatch(UiEvent::SearchSubmit("dal & rice".into()))
        .await;

    search.assert_async().await;
    let rendered = shop.page().search_results().expect("placeholder rendered");
    assert!(rendered.is_placeholder());
    assert!(rendered.html.contains(NO_RESULTS_MESSAGE));
}

#[tokio::test]
async fn test_typing_burst_sends_one_request() {
    let mut server = Server::new_async().await;
    let last = server
        .mock("GET", "/api/search")
        .match_query(Matcher::UrlEncoded("q".into(), "pizza".into()))
        .with_status(200)
        .with_body(PIZZAS)
        .expect(1)
        .create_async()
        .await;
    let earlier = server
        .mock("GET", "/api/search")
        .match_query(Matcher::Regex("q=(p|pi|piz|pizz)$".into()))
        .expect(0)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.search.debounce = Duration::from_millis(50);
    let shop = storefront(config, CART_PAGE, true);

    for prefix in ["p", "pi", "piz", "pizz", "pizza"] {
        shop.dispatch(UiEvent::SearchInput(prefix.into())).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    last.assert_async().await;
    earlier.assert_async().await;
    assert_eq!(
        shop.page().search_results().map(|r| r.query),
        Some("pizza".to_string())
    );
}

#[tokio::test]
async fn test_single_character_sends_nothing() {
    let mut server = Server::new_async().await;
    let search = server
        .mock("GET", "/api/search")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let shop = storefront(config_for(&server), CART_PAGE, true);
    let outcome = shop.dispatch(UiEvent::SearchSubmit("z".into())).await;

    search.assert_async().await;
    assert_eq!(outcome, EventOutcome::Search(SearchOutcome::TooShort));
    assert_eq!(shop.page().search_results(), None);
}

#[tokio::test]
async fn test_backend_failure_notifies() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/search")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let shop = storefront(config_for(&server), CART_PAGE, true);
    let outcome = shop.dispatch(UiEvent::SearchSubmit("biryani".into())).await;

    assert!(matches!(
        outcome,
        EventOutcome::Search(SearchOutcome::Failed { .. })
    ));
    assert_eq!(messages(&shop), vec!["Search failed"]);
    assert!(!shop.loading().is_visible());
}
