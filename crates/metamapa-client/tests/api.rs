use chrono::NaiveDate;
use metamapa_client::{ADMIN_HEADER, ApiClient, CONTRIBUTOR_HEADER, ClientConfig, ClientError};
use metamapa_common::{Attachment, FilterCriteria, NewFactRequest, VisibilityMode};
use metamapa_map::FactSource;
use metamapa_test_harness::{CannedResponse, StubApi};
use serde_json::json;
use std::time::Duration;

fn client_for(stub: &StubApi) -> ApiClient {
    ApiClient::new(&ClientConfig::new(stub.base_url())).expect("client")
}

fn attachment(name: &str, content_type: &str) -> Attachment {
    Attachment {
        file_name: name.to_string(),
        content_type: content_type.to_string(),
        bytes: b"contenido".to_vec(),
    }
}

#[tokio::test]
async fn list_facts_sends_only_set_filters() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_facts(json!([
        { "id": 7, "titulo": "Corte de luz", "latitud": "-34.6", "longitud": -58.4 },
        { "id": "abc", "titulo": "Inundación", "ubicacion": { "latitud": -31.4, "longitud": -64.2 } }
    ]));
    let client = client_for(&stub);

    let criteria = FilterCriteria {
        categoria: Some("Servicios".to_string()),
        desde: NaiveDate::from_ymd_opt(2024, 5, 1),
        modo: Some(VisibilityMode::Curated),
        ..FilterCriteria::default()
    };
    let facts = client.list_facts(&criteria).await.expect("facts");
    assert_eq!(facts.len(), 2);
    assert_eq!(facts[1].title.as_deref(), Some("Inundación"));

    let requests = stub.requests_to("GET", "/api/interna/hechos");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.query_value("categoria"), Some("Servicios"));
    assert_eq!(request.query_value("desde"), Some("2024-05-01"));
    assert_eq!(request.query_value("modo"), Some("CURADA"));
    assert_eq!(request.query_value("hasta"), None);
    assert_eq!(request.query_value("ubicacion"), None);
}

#[tokio::test]
async fn list_facts_maps_error_bodies() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.fail_facts(500, json!({ "error": "base no disponible" }));
    let err = client_for(&stub)
        .list_facts(&FilterCriteria::default())
        .await
        .expect_err("server error");
    assert!(matches!(err, ClientError::Status { status: 500, .. }));
    assert_eq!(err.remote_message(), Some("base no disponible"));
    assert!(!err.is_connection());
}

#[tokio::test]
async fn fact_source_delegates_to_list_facts() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_facts(json!([{ "id": 1, "titulo": "Granizo" }]));
    let client = client_for(&stub);
    let source: &dyn FactSource = &client;
    let facts = source
        .fetch_facts(&FilterCriteria::default())
        .await
        .expect("facts");
    assert_eq!(facts.len(), 1);
}

#[tokio::test]
async fn create_fact_sends_descriptor_and_media_only() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_create_response(CannedResponse::ok(json!({
        "id": 99,
        "titulo": "Incendio",
        "latitud": -31.4,
        "longitud": -64.2
    })));
    let client = client_for(&stub);

    let descriptor = NewFactRequest {
        titulo: "Incendio".to_string(),
        descripcion: "Humo en la sierra".to_string(),
        categoria: "incendio".to_string(),
        etiquetas: vec!["humo".to_string()],
        fecha: NaiveDate::from_ymd_opt(2024, 8, 15),
        hora: Some("09:30".to_string()),
        latitud: Some(-31.4),
        longitud: Some(-64.2),
    }
    .into_descriptor()
    .expect("descriptor");

    let created = client
        .create_fact(
            "contrib-1",
            &descriptor,
            vec![
                attachment("foto.jpg", "image/jpeg"),
                attachment("notas.pdf", "application/pdf"),
                attachment("clip.mp4", "video/mp4"),
            ],
        )
        .await
        .expect("created")
        .expect("fact body");
    assert_eq!(created.id.map(|id| id.to_string()), Some("99".to_string()));

    let requests = stub.requests_to("POST", "/api/interna/hechos");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.header(CONTRIBUTOR_HEADER), Some("contrib-1"));

    let hecho = request.part("hecho").expect("hecho part");
    assert_eq!(hecho.content_type.as_deref(), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&hecho.bytes).expect("json");
    assert_eq!(body["fechaHecho"], "2024-08-15T09:30:00");
    assert_eq!(body["titulo"], "Incendio");

    let files: Vec<_> = request
        .parts_named("archivos")
        .into_iter()
        .filter_map(|part| part.file_name.clone())
        .collect();
    assert_eq!(files, vec!["foto.jpg", "clip.mp4"]);
}

#[tokio::test]
async fn create_fact_reports_plain_text_validation_errors() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_create_response(CannedResponse::error(
        400,
        json!("La categoría es requerida"),
    ));
    let descriptor = NewFactRequest {
        titulo: "Sin categoría".to_string(),
        fecha: NaiveDate::from_ymd_opt(2024, 1, 1),
        latitud: Some(0.0),
        longitud: Some(0.0),
        ..NewFactRequest::default()
    }
    .into_descriptor()
    .expect("descriptor");

    let err = client_for(&stub)
        .create_fact("contrib-1", &descriptor, Vec::new())
        .await
        .expect_err("rejected");
    assert_eq!(err.remote_message(), Some("La categoría es requerida"));
}

#[tokio::test]
async fn import_dataset_uploads_file_part() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_import_response(CannedResponse::ok(json!({
        "exitoso": true,
        "mensaje": "Importación completa",
        "procesadas": 3,
        "insertadas": 2,
        "reemplazadas": 1,
        "salteadas": 0,
        "errores": []
    })));

    let report = client_for(&stub)
        .import_dataset("admin-1", attachment("incendios.csv", ""))
        .await
        .expect("report");
    assert!(report.exitoso);
    assert_eq!(report.insertadas, 2);

    let requests = stub.requests_to("POST", "/api/admin/importar-dataset");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header(ADMIN_HEADER), Some("admin-1"));
    let file = requests[0].part("file").expect("file part");
    assert_eq!(file.file_name.as_deref(), Some("incendios.csv"));
    assert_eq!(file.content_type.as_deref(), Some("text/csv"));
    assert_eq!(file.text(), "contenido");
}

#[tokio::test]
async fn import_dataset_surfaces_error_field() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_import_response(CannedResponse::error(
        400,
        json!({ "error": "Solo se aceptan archivos CSV" }),
    ));
    let err = client_for(&stub)
        .import_dataset("admin-1", attachment("datos.xlsx", "application/vnd.ms-excel"))
        .await
        .expect_err("rejected");
    assert_eq!(err.remote_message(), Some("Solo se aceptan archivos CSV"));
}

#[tokio::test]
async fn list_imports_decodes_history() {
    let stub = StubApi::spawn().await.expect("stub");
    stub.set_imports(json!([
        { "id": 1, "nombreArchivo": "a.csv", "estado": "PROCESADO", "filasProcesadas": 4 },
        { "id": 2, "nombreArchivo": "b.csv", "estado": "ERROR" }
    ]));
    let runs = client_for(&stub).list_imports().await.expect("runs");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].filas_procesadas, 4);
    assert_eq!(runs[1].nombre_archivo, "b.csv");
}

#[tokio::test]
async fn unreachable_api_is_a_connection_error() {
    let stub = StubApi::spawn().await.expect("stub");
    let base_url = stub.base_url();
    drop(stub);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = ApiClient::new(
        &ClientConfig::new(base_url).with_timeout(Duration::from_secs(2)),
    )
    .expect("client");
    let err = client.list_imports().await.expect_err("down");
    assert!(err.is_connection());
}
