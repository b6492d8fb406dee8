use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = app.get("/health_check").await;

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn stylesheet_is_served() {
    let app = spawn_app().await;

    let response = app.get("/assets/style.css").await;

    assert_eq!(response.status().as_u16(), 200);
}
