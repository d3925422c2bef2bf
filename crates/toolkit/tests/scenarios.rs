use runtime::tools::{FailureKind, InvocationRequest, InvocationResult, ToolRegistry};
use serde_json::{Value, json};
use toolkit::Profile;

fn registry() -> ToolRegistry {
    Profile::All.registry().unwrap()
}

async fn call(registry: &ToolRegistry, tool: &str, arguments: Value) -> InvocationResult {
    registry
        .dispatch(&InvocationRequest::new(tool, arguments))
        .await
}

fn payload(result: InvocationResult) -> String {
    match result {
        InvocationResult::Success { payload } => payload,
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn weather_for_known_city() {
    let registry = registry();
    let first = payload(call(&registry, "get_weather", json!({ "city": "Tokyo" })).await);
    assert_eq!(
        first,
        "Weather in Tokyo: Rainy, Temperature: 68°F, Humidity: 85%"
    );

    let second = payload(call(&registry, "get_weather", json!({ "city": "Tokyo" })).await);
    assert_eq!(first, second);
}

#[tokio::test]
async fn weather_for_unknown_city_lists_alternatives() {
    let registry = registry();
    let text = payload(call(&registry, "get_weather", json!({ "city": "Atlantis" })).await);
    assert!(text.starts_with("Sorry, weather data is not available for Atlantis."));
    for city in ["New York", "London", "Tokyo", "Dubai", "Mumbai"] {
        assert!(text.contains(city), "missing {city}");
    }
}

#[tokio::test]
async fn weather_requires_city() {
    let result = call(&registry(), "get_weather", json!({})).await;
    assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArguments));
}

#[tokio::test]
async fn mortgage_with_defaults() {
    let registry = registry();
    let text = payload(
        call(
            &registry,
            "calculate_mortgage",
            json!({ "property_price": 450000 }),
        )
        .await,
    );
    assert!(text.contains("Down Payment (20%): $90,000.00"));
    assert!(text.contains("Loan Amount: $360,000.00"));
    assert!(text.contains("Monthly Payment: $2,275.44"));
    assert!(text.contains("Without a down payment: $2,844.31 per month"));
    assert!(text.contains("Interest Rate: 6.5%"));

    let explicit = payload(
        call(
            &registry,
            "calculate_mortgage",
            json!({
                "property_price": 450000,
                "down_payment_percent": 20,
                "interest_rate": 6.5,
                "loan_term_years": 30,
            }),
        )
        .await,
    );
    assert_eq!(text, explicit);
}

#[test]
fn amortization_of_full_price() {
    let payment = toolkit::real_estate::amortized_payment(450_000.0, 6.5, 30);
    assert_eq!(toolkit::money(payment), "2,844.31");
    assert!((payment - 2844.31).abs() < 0.005);
}

#[tokio::test]
async fn mortgage_rejects_out_of_range_down_payment() {
    let result = call(
        &registry(),
        "calculate_mortgage",
        json!({ "property_price": 450000, "down_payment_percent": 120 }),
    )
    .await;
    assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArguments));
}

#[tokio::test]
async fn property_search_drops_listings_over_budget() {
    let registry = registry();
    let text = payload(
        call(
            &registry,
            "search_properties",
            json!({
                "location": "Seattle",
                "min_price": 400000,
                "max_price": 460000,
                "bedrooms": 3,
            }),
        )
        .await,
    );
    assert!(text.starts_with("Found 1 house(s) in Seattle:"));
    assert!(text.contains("123 Main St, Seattle"));
    assert!(text.contains("Price: $450,000 | 3 bed, 2 bath"));
    assert!(!text.contains("456 Oak Ave"));
    assert!(!text.contains("789 Elm Dr"));
}

#[tokio::test]
async fn property_search_reports_zero_results() {
    let text = payload(
        call(
            &registry(),
            "search_properties",
            json!({
                "location": "Seattle",
                "property_type": "condo",
                "min_price": 500000,
                "max_price": 500000,
            }),
        )
        .await,
    );
    assert_eq!(
        text,
        "No condos found in Seattle within price range $500,000 - $500,000"
    );
}

#[tokio::test]
async fn property_search_rejects_unknown_type() {
    let result = call(
        &registry(),
        "search_properties",
        json!({ "location": "Seattle", "property_type": "castle" }),
    )
    .await;
    assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArguments));
}

#[tokio::test]
async fn unknown_tool_leaves_registry_usable() {
    let registry = registry();
    let result = call(&registry, "get_horoscope", json!({})).await;
    assert_eq!(result.failure_kind(), Some(FailureKind::ToolNotFound));

    let text = payload(call(&registry, "list_cities", Value::Null).await);
    assert!(text.starts_with("Available cities:"));
}

#[tokio::test]
async fn market_trends_default_timeframe() {
    let text = payload(
        call(
            &registry(),
            "get_market_trends",
            json!({ "location": "Austin" }),
        )
        .await,
    );
    assert!(text.starts_with("Market Trends for Austin (Last 3 months):"));
    assert!(text.contains("Average Price Change: +5.8%"));
}

#[test]
fn descriptors_document_defaults() {
    let registry = registry();
    let doc = registry
        .get("search_properties")
        .unwrap()
        .descriptor()
        .render_doc();
    assert!(doc.contains("property_type (enumerated-text) one of [house, apartment, condo, townhouse] default \"house\""));
    assert!(doc.contains("location (text) required"));

    let mortgage = registry.get("calculate_mortgage").unwrap().descriptor();
    assert!(mortgage.description().contains("'Monthly Payment' amortizes the financed amount"));
    assert!(mortgage.description().contains("'Without a down payment' amortizes the full price"));
}
