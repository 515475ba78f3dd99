use actix_http::Request;
use actix_web::{
    dev::{Service, ServiceResponse},
    error::ResponseError as _,
    http::StatusCode,
    test,
    web,
    App,
    Error,
    HttpResponse,
};
use ccg_common::Secret;

use crate::{
    helpers::calculate_hmac,
    middleware::{ApiKeyMiddlewareFactory, HmacMiddlewareFactory, API_KEY_HEADER, HMAC_HEADER},
};

const SECRET: &str = "topsecret";
const BODY: &[u8] = br#"{"id":1001,"total_price":"100.00"}"#;

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

async fn call<S>(app: &S, req: Request) -> Result<(StatusCode, web::Bytes), (StatusCode, String)>
where S: Service<Request, Response = ServiceResponse, Error = Error> {
    match test::try_call_service(app, req).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body(resp).await;
            Ok((status, body))
        },
        Err(e) => Err((e.as_response_error().status_code(), e.to_string())),
    }
}

macro_rules! hmac_app {
    ($enabled:expr) => {
        test::init_service(App::new().service(
            web::scope("/shopify")
                .wrap(HmacMiddlewareFactory::new(HMAC_HEADER, Secret::new(SECRET.to_string()), $enabled))
                .route("/webhook", web::post().to(echo)),
        ))
        .await
    };
}

#[actix_web::test]
async fn valid_signature_passes_and_the_body_survives_verification() {
    let _ = env_logger::try_init();
    let app = hmac_app!(true);
    let signature = calculate_hmac(SECRET, BODY);
    let req = test::TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header((HMAC_HEADER, signature))
        .set_payload(BODY.to_vec())
        .to_request();
    let (status, body) = call(&app, req).await.expect("request should succeed");
    assert_eq!(status, StatusCode::OK);
    // The middleware consumed the body to verify it; the handler must still see it.
    assert_eq!(body.as_ref(), BODY);
}

#[actix_web::test]
async fn wrong_signature_is_rejected_with_401() {
    let _ = env_logger::try_init();
    let app = hmac_app!(true);
    let signature = calculate_hmac("not-the-secret", BODY);
    let req = test::TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header((HMAC_HEADER, signature))
        .set_payload(BODY.to_vec())
        .to_request();
    let (status, message) = call(&app, req).await.expect_err("request should be rejected");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn missing_signature_is_rejected_with_401() {
    let _ = env_logger::try_init();
    let app = hmac_app!(true);
    let req = test::TestRequest::post().uri("/shopify/webhook").set_payload(BODY.to_vec()).to_request();
    let (status, message) = call(&app, req).await.expect_err("request should be rejected");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, "No HMAC signature found.");
}

#[actix_web::test]
async fn disabled_checks_let_unsigned_requests_through() {
    let _ = env_logger::try_init();
    let app = hmac_app!(false);
    let req = test::TestRequest::post().uri("/shopify/webhook").set_payload(BODY.to_vec()).to_request();
    let (status, _) = call(&app, req).await.expect("request should succeed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn admin_scope_requires_the_api_key() {
    let _ = env_logger::try_init();
    let app = test::init_service(App::new().service(
        web::scope("/api")
            .wrap(ApiKeyMiddlewareFactory::new(Secret::new("adminkey".to_string())))
            .route("/ping", web::get().to(|| async { HttpResponse::Ok().body("pong") })),
    ))
    .await;

    let req = test::TestRequest::get().uri("/api/ping").to_request();
    let (status, _) = call(&app, req).await.expect_err("unauthenticated request should fail");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/ping").insert_header((API_KEY_HEADER, "wrong")).to_request();
    let (status, _) = call(&app, req).await.expect_err("wrong key should fail");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/ping").insert_header((API_KEY_HEADER, "adminkey")).to_request();
    let (status, body) = call(&app, req).await.expect("correct key should pass");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), b"pong");
}
