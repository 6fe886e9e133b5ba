mod common;

use axum::http::StatusCode;
use common::*;

const NEW_TEMPLATE_JSON: &str = r#"{"endpointTemplate": {
    "name": "glance",
    "type": "image",
    "publicURL": "http://glance.example.com:9292/v1",
    "adminURL": "http://glance.example.com:9292/v1",
    "internalURL": "http://glance.internal:9292/v1",
    "global": true
}}"#;

const NEW_TEMPLATE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<endpointTemplate xmlns="http://docs.openstack.org/identity/api/v2.0"
    name="glance" type="image" global="true"
    publicURL="http://glance.example.com:9292/v1"
    adminURL="http://glance.example.com:9292/v1"
    internalURL="http://glance.internal:9292/v1"/>"#;

fn new_template(format: Format) -> &'static str {
    match format {
        Format::Json => NEW_TEMPLATE_JSON,
        Format::Xml => NEW_TEMPLATE_XML,
    }
}

#[tokio::test]
async fn test_list_templates_empty_catalog() {
    let app = app().await;

    let reply = app
        .get("/v2.0/endpointTemplates", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), serde_json::json!({"endpointTemplates": []}));

    let reply = app
        .get("/v2.0/endpointTemplates", Some(ADMIN_TOKEN), Format::Xml)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.starts_with("application/xml"));
    assert!(reply.body.contains("<endpointTemplates"));
    assert!(!reply.body.contains("<endpointTemplate "));
}

#[tokio::test]
async fn test_list_templates() {
    let app = app_with_template().await;
    for format in FORMATS {
        let reply = app
            .get("/v2.0/endpointTemplates", Some(ADMIN_TOKEN), format)
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{:?}", format);
        assert!(reply.body.contains("endpointTemplates"));
    }

    let listed = app
        .get("/v2.0/endpointTemplates", Some(ADMIN_TOKEN), Format::Json)
        .await
        .json();
    assert_eq!(listed["endpointTemplates"][0]["id"], 1);
    assert_eq!(listed["endpointTemplates"][0]["type"], "compute");
}

#[tokio::test]
async fn test_list_templates_denied_credentials() {
    let app = app_with_template().await;
    for format in FORMATS {
        for (token, expected) in DENIALS {
            let reply = app.get("/v2.0/endpointTemplates", *token, format).await;
            assert_eq!(reply.status, *expected, "{:?} {:?}", token, format);
        }
    }
}

#[tokio::test]
async fn test_get_template() {
    let app = app_with_template().await;

    let reply = app
        .get("/v2.0/endpointTemplates/1", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["endpointTemplate"]["id"], 1);
    assert_eq!(body["endpointTemplate"]["name"], "nova");
    assert_eq!(
        body["endpointTemplate"]["publicURL"],
        "http://nova.example.com:8774/v1.1/%tenant_id%"
    );

    let reply = app
        .get("/v2.0/endpointTemplates/1", Some(ADMIN_TOKEN), Format::Xml)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("<endpointTemplate "));
    assert!(reply.body.contains("id=\"1\""));
}

#[tokio::test]
async fn test_get_template_denied_credentials() {
    let app = app_with_template().await;
    for format in FORMATS {
        for (token, expected) in DENIALS {
            let reply = app.get("/v2.0/endpointTemplates/1", *token, format).await;
            assert_eq!(reply.status, *expected, "{:?} {:?}", token, format);
        }
    }
}

#[tokio::test]
async fn test_unrecognized_token_is_not_found_whether_or_not_template_exists() {
    let app = app_with_template().await;
    for uri in ["/v2.0/endpointTemplates/1", "/v2.0/endpointTemplates/42"] {
        let reply = app.get(uri, Some(UNKNOWN_TOKEN), Format::Json).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.json().get("itemNotFound").is_some());
    }
}

#[tokio::test]
async fn test_get_missing_template() {
    let app = app_with_template().await;
    for uri in ["/v2.0/endpointTemplates/42", "/v2.0/endpointTemplates/nova"] {
        let reply = app.get(uri, Some(ADMIN_TOKEN), Format::Json).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let reply = app
        .get("/v2.0/endpointTemplates/42", Some(ADMIN_TOKEN), Format::Xml)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.content_type.starts_with("application/xml"));
    assert!(reply.body.contains("<itemNotFound"));
    assert!(reply.body.contains("code=\"404\""));
}

#[tokio::test]
async fn test_create_template() {
    for format in FORMATS {
        let app = app_with_template().await;
        let reply = app
            .post(
                "/v2.0/endpointTemplates",
                Some(ADMIN_TOKEN),
                format,
                new_template(format),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}: {}", format, reply.body);
        assert!(reply.body.contains("endpointTemplate"));

        let fetched = app
            .get("/v2.0/endpointTemplates/2", Some(ADMIN_TOKEN), Format::Json)
            .await
            .json();
        assert_eq!(fetched["endpointTemplate"]["name"], "glance");
        assert_eq!(fetched["endpointTemplate"]["global"], true);
    }
}

#[tokio::test]
async fn test_create_template_missing_url_is_bad_request() {
    let app = app().await;
    let reply = app
        .post(
            "/v2.0/endpointTemplates",
            Some(ADMIN_TOKEN),
            Format::Json,
            r#"{"endpointTemplate": {"name": "glance", "type": "image"}}"#,
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json().get("badRequest").is_some());

    let reply = app
        .get("/v2.0/endpointTemplates", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(reply.json(), serde_json::json!({"endpointTemplates": []}));
}

#[tokio::test]
async fn test_create_template_denied_before_body_is_read() {
    let app = app().await;
    for (token, expected) in DENIALS {
        let reply = app
            .post("/v2.0/endpointTemplates", *token, Format::Json, "not json")
            .await;
        assert_eq!(reply.status, *expected, "{:?}", token);
    }
}

#[tokio::test]
async fn test_update_template_keeps_existing_endpoint_snapshot() {
    let app = app_with_template().await;
    let created = app
        .post(
            "/v2.0/tenants/1234/endpoints",
            Some(ADMIN_TOKEN),
            Format::Json,
            &endpoint_body(Format::Json, "1"),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let reply = app
        .put(
            "/v2.0/endpointTemplates/1",
            Some(ADMIN_TOKEN),
            Format::Json,
            r#"{"endpointTemplate": {
                "name": "nova",
                "type": "compute",
                "publicURL": "https://compute.example.com/%tenant_id%",
                "adminURL": "https://compute.example.com/%tenant_id%",
                "internalURL": "https://compute.internal/%tenant_id%"
            }}"#,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.json()["endpointTemplate"]["id"], 1);

    let endpoints = app
        .get("/v2.0/tenants/1234/endpoints", Some(ADMIN_TOKEN), Format::Json)
        .await
        .json();
    assert_eq!(
        endpoints["endpoints"][0]["publicURL"],
        "http://nova.example.com:8774/v1.1/1234"
    );
}

#[tokio::test]
async fn test_delete_template_twice() {
    let app = app_with_template().await;
    let first = app
        .delete("/v2.0/endpointTemplates/1", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);
    assert!(first.body.is_empty());

    let second = app
        .delete("/v2.0/endpointTemplates/1", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);

    let gone = app
        .get("/v2.0/endpointTemplates/1", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_template_denied_credentials() {
    let app = app_with_template().await;
    for (token, expected) in DENIALS {
        let reply = app
            .delete("/v2.0/endpointTemplates/1", *token, Format::Json)
            .await;
        assert_eq!(reply.status, *expected, "{:?}", token);
    }
    let still_there = app
        .get("/v2.0/endpointTemplates/1", Some(ADMIN_TOKEN), Format::Json)
        .await;
    assert_eq!(still_there.status, StatusCode::OK);
}
