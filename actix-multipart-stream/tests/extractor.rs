use actix_multipart_stream::{
    ErrorCause, Multipart, MultipartConfig, MultipartParseError, ParseOptions,
};
use actix_web::{
    dev::Payload,
    http::{header::CONTENT_TYPE, StatusCode},
    test, web, App, HttpResponse,
};

const BODY: &str = "--XyZ\r\n\
    Content-Disposition: form-data; name=\"title\"\r\n\r\n\
    hello\r\n\
    --XyZ\r\n\
    Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
    Content-Type: text/plain\r\n\r\n\
    file contents\r\n\
    --XyZ--\r\n";

async fn describe(mut form: Multipart<Payload>) -> Result<String, MultipartParseError> {
    let mut lines = Vec::new();
    while let Some(part) = form.next_part().await? {
        let name = part.name().unwrap_or_default().to_owned();
        let filename = part.filename().map(str::to_owned);
        let text = part.text().await?;
        lines.push(match filename {
            Some(filename) => format!("{name}={text} ({filename})"),
            None => format!("{name}={text}"),
        });
    }
    Ok(lines.join("\n"))
}

#[actix_web::test]
async fn extracts_parts_in_order() {
    let app = test::init_service(App::new().route("/", web::post().to(describe))).await;

    let req = test::TestRequest::post()
        .uri("/")
        .insert_header((CONTENT_TYPE, "multipart/form-data; boundary=XyZ"))
        .set_payload(BODY)
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = test::read_body(res).await;
    assert_eq!(body, "title=hello\ndoc=file contents (a.txt)");
}

#[actix_web::test]
async fn rejects_non_multipart_requests() {
    let app = test::init_service(App::new().route("/", web::post().to(describe))).await;

    let req = test::TestRequest::post()
        .uri("/")
        .insert_header((CONTENT_TYPE, "application/json"))
        .set_payload("{}")
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[actix_web::test]
async fn custom_error_handler() {
    let config = MultipartConfig::default().set_error_handler(|err| {
        assert!(matches!(err.cause(), ErrorCause::MissingBoundary));
        HttpResponse::ImATeapot().body(err.message())
    });
    let app = test::init_service(
        App::new()
            .app_data(config)
            .route("/", web::post().to(describe)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/")
        .insert_header((CONTENT_TYPE, "multipart/form-data"))
        .set_payload(BODY)
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    let body = test::read_body(res).await;
    assert_eq!(body, "Multipart content type has no boundary parameter");
}

#[actix_web::test]
async fn configured_limits_apply() {
    let config = MultipartConfig::default().set_options(ParseOptions::new().max_file_size(8));
    let app = test::init_service(
        App::new()
            .app_data(config)
            .route("/", web::post().to(describe)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/")
        .insert_header((CONTENT_TYPE, "multipart/form-data; boundary=XyZ"))
        .set_payload(BODY)
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn errors_can_use_the_configured_handler() {
    let config = MultipartConfig::default()
        .set_error_handler(|err| HttpResponse::UnprocessableEntity().body(err.message()));

    let err = MultipartParseError::from(ErrorCause::Unterminated);
    let res = err.to_response(Some(&config));
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = err.to_response(None);
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
