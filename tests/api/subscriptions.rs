use chrono::{Days, Utc};

use crate::helpers::{TestOptions, assert_is_redirect_to, spawn_app, spawn_app_with};

#[tokio::test]
async fn adding_a_valid_subscription_shows_it_on_the_dashboard() {
    let app = spawn_app().await;
    app.signed_in().await;

    let response = app.post_subscription("Netflix", "15.49", "2030-05-01").await;
    assert_is_redirect_to(&response, "/");

    let html = app.get_html("/").await;
    assert!(html.contains("Added subscription: Netflix"));
    assert!(html.contains("15.49"));
    assert!(html.contains("2030-05-01"));
    assert!(html.contains("Total: 15.49"));
}

#[tokio::test]
async fn renewal_date_is_optional() {
    let app = spawn_app().await;
    app.signed_in().await;

    assert_is_redirect_to(&app.post_subscription("Gym", "30", "").await, "/");

    assert_eq!(app.subscription_count().await, 1);
    let date: Option<String> = sqlx::query_scalar("SELECT renewal_date FROM subscriptions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(date, None);
    assert!(app.get_html("/").await.contains("Total: 30.00"));
}

#[tokio::test]
async fn invalid_submissions_are_rejected_with_a_message() {
    let app = spawn_app().await;
    app.signed_in().await;

    let cases = [
        (("", "9.99", ""), "Please enter a name for the subscription."),
        (("   ", "9.99", ""), "Please enter a name for the subscription."),
        (("Spotify", "abc", ""), "Price must be a number."),
        (("Spotify", "", ""), "Price must be a number."),
        (("Spotify", "-1", ""), "Price cannot be negative."),
        (("Spotify", "1.999", ""), "Price can have at most two decimal places."),
        (("Spotify", "10000000000", ""), "Price cannot exceed 9999999999.99."),
        (
            ("Spotify", "50000000000000000000000000000", ""),
            "Price cannot exceed 9999999999.99.",
        ),
        (("Spotify", "9.99", "2024-13-01"), "Date must be in YYYY-MM-DD format."),
        (("Spotify", "9.99", "01/02/2024"), "Date must be in YYYY-MM-DD format."),
    ];

    for ((name, price, date), message) in cases {
        let response = app.post_subscription(name, price, date).await;
        assert_is_redirect_to(&response, "/");

        let html = app.get_html("/").await;
        assert!(
            html.contains(message),
            "expected `{message}` for ({name:?}, {price:?}, {date:?})"
        );
    }

    assert_eq!(app.subscription_count().await, 0);
}

#[tokio::test]
async fn zero_priced_subscriptions_are_allowed() {
    let app = spawn_app().await;
    app.signed_in().await;

    assert_is_redirect_to(&app.post_subscription("Free trial", "0", "").await, "/");
    assert_eq!(app.subscription_count().await, 1);
}

#[tokio::test]
async fn dashboard_total_is_the_sum_of_prices() {
    let app = spawn_app().await;
    app.signed_in().await;

    app.post_subscription("Music", "10", "").await;
    app.post_subscription("Cloud", "5.50", "").await;
    app.post_subscription("News", "0.05", "").await;

    assert!(app.get_html("/").await.contains("Total: 15.55"));
}

#[tokio::test]
async fn empty_dashboard_shows_a_zero_total() {
    let app = spawn_app().await;
    app.signed_in().await;

    let html = app.get_html("/").await;
    assert!(html.contains("No subscriptions yet."));
    assert!(html.contains("Total: 0.00"));
}

#[tokio::test]
async fn subscriptions_are_listed_by_renewal_date_with_undated_last() {
    let app = spawn_app().await;
    app.signed_in().await;

    app.post_subscription("Undated", "1", "").await;
    app.post_subscription("Later", "1", "2031-01-02").await;
    app.post_subscription("Sooner", "1", "2031-01-01").await;

    let html = app.get_html("/").await;
    let position = |name: &str| html.find(&format!("<td>{name}</td>")).unwrap();
    assert!(position("Sooner") < position("Later"));
    assert!(position("Later") < position("Undated"));
}

#[tokio::test]
async fn renewals_inside_the_window_are_flagged_as_due_soon() {
    let app = spawn_app().await;
    app.signed_in().await;

    let today = Utc::now().date_naive();
    let soon = today.checked_add_days(Days::new(3)).unwrap().to_string();
    let later = today.checked_add_days(Days::new(30)).unwrap().to_string();
    app.post_subscription("Soon", "1", &soon).await;
    app.post_subscription("Later", "1", &later).await;

    let html = app.get_html("/").await;
    assert!(html.contains("Due soon: Soon"));
    assert!(!html.contains("Due soon: Soon, Later"));
}

#[tokio::test]
async fn users_only_see_their_own_subscriptions() {
    let app = spawn_app().await;
    app.signed_in().await;
    app.post_subscription("Private", "12", "").await;

    let other = app.new_client();
    app.post_signup_with(&other, "other@example.com", "password")
        .await;
    let html = app.get_with(&other, "/").await.text().await.unwrap();

    assert!(!html.contains("Private"));
    assert!(html.contains("Total: 0.00"));
}

#[tokio::test]
async fn deleting_an_owned_subscription_removes_it() {
    let app = spawn_app().await;
    app.signed_in().await;
    app.post_subscription("Netflix", "15.49", "").await;
    let id = app.subscription_id("Netflix").await;

    let response = app.post_delete(id).await;
    assert_is_redirect_to(&response, "/");

    let html = app.get_html("/").await;
    assert!(html.contains("Subscription deleted"));
    assert!(!html.contains("<td>Netflix</td>"));
    assert_eq!(app.subscription_count().await, 0);
}

#[tokio::test]
async fn deleting_someone_elses_subscription_is_not_found() {
    let app = spawn_app().await;
    app.signed_in().await;
    app.post_subscription("Mine", "3", "").await;
    let id = app.subscription_id("Mine").await;

    let intruder = app.new_client();
    app.post_signup_with(&intruder, "intruder@example.com", "password")
        .await;
    let response = app.post_delete_with(&intruder, id).await;
    assert_is_redirect_to(&response, "/");

    let html = app.get_with(&intruder, "/").await.text().await.unwrap();
    assert!(html.contains("Subscription not found."));
    assert_eq!(app.subscription_count().await, 1);
}

#[tokio::test]
async fn deleting_a_missing_subscription_is_not_found() {
    let app = spawn_app().await;
    app.signed_in().await;

    assert_is_redirect_to(&app.post_delete(4242).await, "/");
    assert!(app.get_html("/").await.contains("Subscription not found."));
}

#[tokio::test]
async fn free_accounts_are_capped() {
    let app = spawn_app_with(TestOptions {
        free_tier_limit: Some(2),
        ..TestOptions::default()
    })
    .await;
    app.signed_in().await;

    app.post_subscription("One", "1", "").await;
    app.post_subscription("Two", "1", "").await;
    let response = app.post_subscription("Three", "1", "").await;
    assert_is_redirect_to(&response, "/");

    let html = app.get_html("/").await;
    assert!(html.contains("Free limit reached (2)."));
    assert_eq!(app.subscription_count().await, 2);

    // Freeing a slot lets the next one in.
    let id = app.subscription_id("One").await;
    app.post_delete(id).await;
    app.post_subscription("Three", "1", "").await;
    assert_eq!(app.subscription_count().await, 2);
    app.subscription_id("Three").await;
}

#[tokio::test]
async fn premium_accounts_are_not_capped() {
    let app = spawn_app_with(TestOptions {
        free_tier_limit: Some(1),
        ..TestOptions::default()
    })
    .await;
    let email = app.signed_in().await;
    sqlx::query("UPDATE users SET premium = 1 WHERE email = ?")
        .bind(&email)
        .execute(&app.pool)
        .await
        .unwrap();

    for name in ["A", "B", "C"] {
        app.post_subscription(name, "1", "").await;
    }
    assert_eq!(app.subscription_count().await, 3);
}

#[tokio::test]
async fn no_cap_when_the_limit_is_disabled() {
    let app = spawn_app_with(TestOptions {
        free_tier_limit: None,
        ..TestOptions::default()
    })
    .await;
    app.signed_in().await;

    for i in 0..8 {
        app.post_subscription(&format!("Sub {i}"), "1", "").await;
    }
    assert_eq!(app.subscription_count().await, 8);
}

#[tokio::test]
async fn dashboard_renders_with_prices_at_the_cap() {
    let app = spawn_app().await;
    app.signed_in().await;

    app.post_subscription("Yacht", "9999999999.99", "").await;
    app.post_subscription("Jet", "9999999999.99", "").await;

    let response = app.get("/").await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Total: 19999999999.98"));
}

#[tokio::test]
async fn deleting_a_malformed_id_is_not_found() {
    let app = spawn_app().await;
    app.signed_in().await;

    let response = app
        .api_client
        .post(format!("{}/delete/abc", app.address))
        .send()
        .await
        .unwrap();
    assert_is_redirect_to(&response, "/");
    assert!(app.get_html("/").await.contains("Subscription not found."));
}
