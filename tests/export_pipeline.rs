use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cv_export_lib::core::models::{ExportDestination, ExportFormat, ExportRequest, ExportSettings};
use cv_export_lib::core::service::CvExportService;

async fn mount_search(server: &MockServer, query: &str, results: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_json(json!({ "query": query })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
        .expect(1)
        .mount(server)
        .await;
}

fn settings_for(server: &MockServer) -> ExportSettings {
    ExportSettings {
        search_url: server.uri(),
        request_delay_ms: 0,
        upload_delay_ms: 0,
        ..ExportSettings::default()
    }
}

fn queries(items: &[&str]) -> Vec<String> {
    items.iter().map(|q| q.to_string()).collect()
}

#[tokio::test]
async fn export_to_local_directory_writes_deduplicated_cvs() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "founder",
        json!([
            { "id": 1, "full_name": "Ada Lovelace", "email": "ada@example.com", "headline": "Analyst" },
            { "id": 2, "full_name": "Grace Hopper" },
            { "id": 3, "full_name": "Katherine Johnson", "combined_text": "CURRICULUM VITAE\nOrbits" }
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_json(json!({ "query": "broken" })))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_search(
        &server,
        "engineer",
        json!([
            { "id": 3, "full_name": "Someone Else" },
            { "id": 4, "full_name": "Margaret Hamilton" },
            { "full_name": "No Identifier" }
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cvs");
    let service = CvExportService::new(settings_for(&server)).unwrap();
    let summary = service
        .export(&ExportRequest {
            queries: queries(&["founder", "broken", "engineer"]),
            format: ExportFormat::Both,
            destination: ExportDestination::LocalDirectory(out.clone()),
        })
        .await
        .unwrap();

    assert_eq!(summary.candidates_found, 4);
    assert_eq!(summary.searches_run, 3);
    assert_eq!(summary.failed_searches, 1);
    assert_eq!(summary.files_written, 8);
    assert_eq!(summary.files_failed, 0);

    let cv = std::fs::read_to_string(out.join("0003_Katherine_Johnson_CV.txt")).unwrap();
    assert!(cv.contains("KATHERINE JOHNSON"));
    assert!(!cv.contains("Someone Else"));
    assert!(std::fs::read(out.join("0004_Margaret_Hamilton_CV.pdf"))
        .unwrap()
        .starts_with(b"%PDF-"));

    let index = std::fs::read_to_string(out.join("0000_INDEX.txt")).unwrap();
    assert!(index.contains("Total Candidates: 4"));
    assert!(index.contains("Email: ada@example.com"));
    assert!(!index.contains("No Identifier"));
}

#[tokio::test]
async fn export_to_drive_uploads_every_file() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "founder",
        json!([{ "id": "a", "full_name": "Ada" }, { "id": "b", "full_name": "Bob" }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "drive-file", "name": "x" })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("key.json");
    std::fs::write(
        &key_path,
        json!({
            "type": "service_account",
            "client_email": "exporter@example.iam.gserviceaccount.com",
            "private_key": include_str!("fixtures/service-account-key.pem"),
            "token_uri": format!("{}/token", server.uri())
        })
        .to_string(),
    )
    .unwrap();

    let mut settings = settings_for(&server);
    settings.credentials_path = key_path;
    settings.drive_upload_url = format!("{}/upload/drive/v3/files", server.uri());
    let service = CvExportService::new(settings).unwrap();

    let summary = service
        .export(&ExportRequest {
            queries: queries(&["founder"]),
            format: ExportFormat::Txt,
            destination: ExportDestination::DriveFolder("folder-1".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(summary.candidates_found, 2);
    assert_eq!(
        summary.destination,
        "https://drive.google.com/drive/folders/folder-1"
    );
    assert_eq!(summary.files_written, 2);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(summary.index_file.as_deref(), Some("drive-file"));
}
