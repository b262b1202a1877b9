mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use common::{data_id, json_body, png_bytes, Part, TestApp, GIF_BYTES};

#[tokio::test]
async fn email_without_mail_settings_is_a_config_error() -> Result<()> {
    let app = TestApp::without_mail().await?;
    let png = png_bytes();

    let response = app
        .post_multipart(
            "/api/delivery/email",
            &[
                Part::Text("email", "ana@x.com"),
                Part::Text("document_type", "ID"),
                Part::File {
                    name: "document",
                    filename: "id.png",
                    content_type: "image/png",
                    data: &png,
                },
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "error");
    assert!(app.mailer().sent().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn email_without_any_payload_is_missing_input() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app
        .post_multipart(
            "/api/delivery/email",
            &[
                Part::Text("email", "ana@x.com"),
                Part::Text("document_type", "ID"),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.mailer().sent().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn email_rejects_an_invalid_recipient() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app
        .post_multipart(
            "/api/delivery/email",
            &[
                Part::Text("email", "not an address"),
                Part::File {
                    name: "pdf",
                    filename: "id.pdf",
                    content_type: "application/pdf",
                    data: b"%PDF-1.4 id",
                },
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.mailer().sent().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn uploaded_image_is_sent_unstamped_when_rendering_is_unavailable() -> Result<()> {
    let app = TestApp::new().await?;
    let png = png_bytes();

    let response = app
        .post_multipart(
            "/api/delivery/email",
            &[
                Part::Text("email", "ana@x.com"),
                Part::Text("document_type", "ID"),
                Part::File {
                    name: "document",
                    filename: "id.png",
                    content_type: "image/png",
                    data: &png,
                },
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["data"]["content_type"], "image/png");
    assert_eq!(body["data"]["stamped"], false);
    assert_eq!(body["data"]["attachment_name"], "ID_upload.png");
    assert_eq!(body["data"]["size"], png.len());

    let sent = app.mailer().sent().await;
    assert_eq!(sent.len(), 1);
    let message = &sent[0];
    assert_eq!(message.to, "ana@x.com");
    assert_eq!(message.from, "noreply@example.org");
    assert_eq!(message.subject, "Your ID Document from CertiKiosk");
    let formatted = message.formatted();
    assert!(formatted.contains("Content-Type: image/png"));
    assert!(formatted.contains("Content-Disposition: attachment; filename=\"ID_upload.png\""));

    let audit = app.get("/api/audit?action=document_email").await?;
    let audit = json_body(audit).await?;
    assert_eq!(audit["pagination"]["total_records"], 1);
    assert_eq!(audit["data"][0]["description"], "Document emailed to ana@x.com");
    assert_eq!(audit["data"][0]["reference"], "upload");

    Ok(())
}

#[tokio::test]
async fn relay_failure_is_a_bad_gateway_and_is_not_audited() -> Result<()> {
    let app = TestApp::new().await?;
    app.mailer().set_failing(true);

    let response = app
        .post_multipart(
            "/api/delivery/email",
            &[
                Part::Text("email", "ana@x.com"),
                Part::Text("document_type", "ID"),
                Part::File {
                    name: "pdf",
                    filename: "id.pdf",
                    content_type: "application/pdf",
                    data: b"%PDF-1.4 id",
                },
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "error");
    assert!(app.mailer().sent().await.is_empty());

    let audit = app.get("/api/audit?action=document_email").await?;
    let audit = json_body(audit).await?;
    assert_eq!(audit["pagination"]["total_records"], 0);

    Ok(())
}

#[tokio::test]
async fn stored_document_is_resolved_by_id() -> Result<()> {
    let app = TestApp::new().await?;
    let upload = app
        .post_multipart(
            "/api/documents/upload",
            &[
                Part::File {
                    name: "file",
                    filename: "passport.pdf",
                    content_type: "application/pdf",
                    data: b"%PDF-1.4 passport",
                },
                Part::Text("national_id", "77"),
                Part::Text("document_type", "Passport"),
            ],
        )
        .await?;
    let document_id = data_id(upload).await?;

    let response = app
        .post_multipart(
            "/api/delivery/email",
            &[
                Part::Text("email", "ana@x.com"),
                Part::Text("document_id", &document_id.to_string()),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["data"]["content_type"], "application/pdf");
    assert_eq!(
        body["data"]["attachment_name"],
        format!("Passport_{document_id}.pdf")
    );

    let sent = app.mailer().sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your Passport Document from CertiKiosk");

    Ok(())
}

#[tokio::test]
async fn stamp_endpoint_rejects_unsupported_formats() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app
        .post_multipart(
            "/api/stamp",
            &[
                Part::File {
                    name: "file",
                    filename: "scan.gif",
                    content_type: "image/gif",
                    data: GIF_BYTES,
                },
                Part::Text("document_type", "ID"),
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let png = png_bytes();
    let response = app
        .post_multipart(
            "/api/stamp",
            &[
                Part::File {
                    name: "file",
                    filename: "scan.png",
                    content_type: "image/png",
                    data: &png,
                },
                Part::File {
                    name: "stamp",
                    filename: "stamp.gif",
                    content_type: "image/gif",
                    data: GIF_BYTES,
                },
            ],
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = app
        .post_multipart("/api/stamp", &[Part::Text("document_type", "ID")])
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn drive_metadata_lists_links() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app.get("/api/drive/1AbCdEf/metadata").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/json")
    );
    let body = json_body(response).await?;
    assert_eq!(body["data"]["file_id"], "1AbCdEf");
    assert_eq!(
        body["data"]["view_url"],
        "https://drive.google.com/file/d/1AbCdEf/view"
    );
    assert_eq!(
        body["data"]["download_url"],
        "https://drive.google.com/uc?export=download&id=1AbCdEf"
    );

    Ok(())
}
