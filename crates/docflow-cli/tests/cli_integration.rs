//! Integration tests for the docflow CLI commands.
//!
//! These exercise the same handlers as the binary against a temporary
//! SQLite file and a temporary config, so nothing leaks between tests.

use docflow_cli::commands;
use docflow_core::models::{AddParticipantInput, CertificateUpdate};
use docflow_core::state::AppState;

struct Env {
    _dir: tempfile::TempDir,
    state: AppState,
}

fn test_env() -> Env {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("docflow.db");
    let config_path = dir.path().join("config.yaml");
    std::fs::write(&config_path, "invoice_payment_terms_days: 30\n").unwrap();
    let state = commands::init_state(
        Some(db_path.to_str().unwrap()),
        Some(config_path.to_str().unwrap()),
    )
    .expect("Failed to initialize state");
    Env { _dir: dir, state }
}

fn id_of(value: &serde_json::Value) -> i64 {
    value["id"].as_i64().expect("Expected numeric id")
}

/// Entity, client with one site, one inspection product and one training product.
async fn seed(state: &AppState) -> (i64, i64, i64, i64, i64) {
    let entity = commands::entity::create(state, "ACM", "Acme Services").await.unwrap();
    let client = commands::client::create(state, "Globex", None, None, None).await.unwrap();
    let site = commands::client::create_site(state, id_of(&client), "Plant A", None, None)
        .await
        .unwrap();
    let inspections = commands::catalog::create_category(state, id_of(&entity), "INS", "Inspections", None)
        .await
        .unwrap();
    assert_eq!(inspections["isTraining"], false);
    let training = commands::catalog::create_category(state, id_of(&entity), "FOR", "Training", None)
        .await
        .unwrap();
    assert_eq!(training["isTraining"], true);
    let product = commands::catalog::create_product(state, id_of(&inspections), "VTE1", "Inspection", None, 12_000)
        .await
        .unwrap();
    let course = commands::catalog::create_product(state, id_of(&training), "EC1", "Fire safety", None, 30_000)
        .await
        .unwrap();
    (
        id_of(&entity),
        id_of(&client),
        id_of(&site),
        id_of(&product),
        id_of(&course),
    )
}

#[tokio::test]
async fn test_entity_create_and_list() {
    let env = test_env();
    commands::entity::create(&env.state, "ACM", "Acme Services").await.unwrap();
    let listed = commands::entity::list(&env.state).await.unwrap();
    let entities = listed["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["code"], "ACM");

    let err = commands::entity::create(&env.state, "acme", "Lowercase").await.unwrap_err();
    assert!(err.contains("three uppercase letters"), "{}", err);
    let err = commands::entity::create(&env.state, "ACM", "Duplicate").await.unwrap_err();
    assert!(err.starts_with("Conflict"), "{}", err);
}

#[tokio::test]
async fn test_client_output_includes_full_address() {
    let env = test_env();
    let created = commands::client::create(
        &env.state,
        "Globex",
        None,
        None,
        Some("1 Main Street, Springfield".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(created["fullAddress"], "1 Main Street, Springfield");

    commands::client::create(&env.state, "Initech", None, None, None).await.unwrap();
    let listed = commands::client::list(&env.state).await.unwrap();
    let clients = listed["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 2);
    let initech = clients.iter().find(|c| c["name"] == "Initech").unwrap();
    assert_eq!(initech["fullAddress"], "No address");
}

#[tokio::test]
async fn test_full_pipeline() {
    let env = test_env();
    let state = &env.state;
    let (entity_id, client_id, site_id, product_id, course_id) = seed(state).await;

    let offer = commands::offer::create(
        state,
        entity_id,
        client_id,
        vec![product_id, course_id],
        vec![site_id],
        Some("Annual contract".to_string()),
        None,
        Some("alice".to_string()),
    )
    .await
    .unwrap();
    let offer_id = id_of(&offer);
    assert_eq!(offer["status"], "DRAFT");
    assert_eq!(offer["amountCents"], 42_000);
    assert!(offer["reference"].as_str().unwrap().starts_with("ACM-OFF-"));

    let shown = commands::document::show(state, Some(offer_id), None).await.unwrap();
    assert_eq!(shown["allowedNext"], serde_json::json!(["SENT"]));
    assert_eq!(shown["products"].as_array().unwrap().len(), 2);

    commands::document::transition(state, offer_id, "sent", None, None).await.unwrap();
    let validated = commands::document::validate(state, offer_id, Some("bob".to_string()), None)
        .await
        .unwrap();
    assert_eq!(validated["document"]["status"], "VALIDATED");
    let proforma_id = id_of(&validated["documents"][0]);
    assert_eq!(validated["documents"][0]["kind"], "PRO");

    commands::document::transition(state, proforma_id, "SENT", None, None).await.unwrap();
    let validated = commands::document::validate(state, proforma_id, None, None).await.unwrap();
    let case_id = id_of(&validated["documents"][0]);
    assert_eq!(validated["documents"][0]["status"], "IN_PROGRESS");

    let completed = commands::document::complete(state, case_id, None, None).await.unwrap();
    let created = completed["documents"].as_array().unwrap();
    assert_eq!(created.iter().filter(|d| d["kind"] == "FAC").count(), 1);
    assert_eq!(created.iter().filter(|d| d["kind"] == "RAP").count(), 2);
    assert_eq!(completed["trainingSessions"].as_array().unwrap().len(), 1);
    let invoice = created.iter().find(|d| d["kind"] == "FAC").unwrap();
    assert!(invoice["dueOn"].is_string());

    let children = commands::document::children(state, case_id).await.unwrap();
    assert_eq!(children["children"].as_array().unwrap().len(), 3);
    assert_eq!(children["trainingSessions"].as_array().unwrap().len(), 1);

    let paid = commands::invoice::pay(state, id_of(invoice), None).await.unwrap();
    assert!(paid["paidOn"].is_string());

    let history = commands::document::history(state, offer_id).await.unwrap();
    let rows = history["history"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["newStatus"], "VALIDATED");
    assert_eq!(rows[2]["changedBy"], "bob");

    let summary = commands::summary::show(state).await.unwrap();
    assert_eq!(summary["totalDocuments"], 6);
    assert_eq!(summary["trainingSessions"], 1);
}

#[tokio::test]
async fn test_training_and_certificate_commands() {
    let env = test_env();
    let state = &env.state;
    let (entity_id, client_id, site_id, _, course_id) = seed(state).await;

    let offer = commands::offer::create(state, entity_id, client_id, vec![course_id], vec![site_id], None, None, None)
        .await
        .unwrap();
    let offer_id = id_of(&offer);
    commands::document::transition(state, offer_id, "SENT", None, None).await.unwrap();
    let step = commands::document::validate(state, offer_id, None, None).await.unwrap();
    let proforma_id = id_of(&step["documents"][0]);
    commands::document::transition(state, proforma_id, "SENT", None, None).await.unwrap();
    let step = commands::document::validate(state, proforma_id, None, None).await.unwrap();
    let case_id = id_of(&step["documents"][0]);
    commands::document::complete(state, case_id, None, None).await.unwrap();

    let sessions = commands::training::sessions(state, case_id).await.unwrap();
    let session_id = id_of(&sessions["sessions"][0]);

    let participant = commands::training::add_participant(
        state,
        session_id,
        AddParticipantInput {
            last_name: "Lopez".to_string(),
            first_name: "Ana".to_string(),
            email: Some("ana@globex.test".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let participant_id = id_of(&participant);

    let scored = commands::training::score(state, participant_id, 16.0, None).await.unwrap();
    assert_eq!(scored["averageScore"], 16.0);
    let err = commands::training::score(state, participant_id, 25.0, None).await.unwrap_err();
    assert!(err.contains("between 0 and 20"), "{}", err);

    let scheduled = commands::training::schedule(
        state,
        session_id,
        Some("M. Durand".to_string()),
        "2025-06-02T09:00:00Z",
        "2025-06-02T12:00:00Z",
    )
    .await
    .unwrap();
    assert_eq!(scheduled["durationHours"], 3.0);

    let roster = commands::training::participants(state, session_id).await.unwrap();
    assert_eq!(roster["participants"].as_array().unwrap().len(), 1);

    let certificate = commands::certificate::issue(state, participant_id, "Fire safety", None)
        .await
        .unwrap();
    assert_eq!(certificate["kind"], "ATT");
    let certificate_id = id_of(&certificate);

    let signed = commands::certificate::update(
        state,
        certificate_id,
        CertificateUpdate {
            skills_acquired: Some("Extinguisher handling".to_string()),
            evaluation_result: Some("Passed".to_string()),
            trainer_signed: Some(true),
            participant_signed: Some(true),
        },
    )
    .await
    .unwrap();
    assert_eq!(signed["complete"], true);

    let shown = commands::document::show(state, None, certificate["reference"].as_str())
        .await
        .unwrap();
    assert_eq!(shown["complete"], true);
}

#[tokio::test]
async fn test_rejected_operations_report_errors() {
    let env = test_env();
    let state = &env.state;
    let (entity_id, client_id, _, product_id, _) = seed(state).await;

    let offer = commands::offer::create(state, entity_id, client_id, vec![product_id], vec![], None, None, None)
        .await
        .unwrap();
    let offer_id = id_of(&offer);

    let err = commands::document::validate(state, offer_id, None, None).await.unwrap_err();
    assert!(err.starts_with("Invalid transition"), "{}", err);

    let err = commands::document::cascade(state, offer_id, None).await.unwrap_err();
    assert!(err.starts_with("Validation error"), "{}", err);

    let err = commands::document::transition(state, offer_id, "SHIPPED", None, None)
        .await
        .unwrap_err();
    assert!(err.contains("Unknown status"), "{}", err);

    let err = commands::document::show(state, Some(9_999), None).await.unwrap_err();
    assert!(err.starts_with("Not found"), "{}", err);

    let err = commands::document::show(state, None, Some("not-a-reference")).await.unwrap_err();
    assert!(err.contains("Invalid reference"), "{}", err);
    let err = commands::document::show(state, None, Some("ACM-OFF-2020-01-1-1-0042"))
        .await
        .unwrap_err();
    assert!(err.starts_with("Not found"), "{}", err);

    let err = commands::document::list(state, Some("XYZ"), None).await.unwrap_err();
    assert!(err.contains("Unknown document type"), "{}", err);

    let err = commands::invoice::pay(state, offer_id, Some("yesterday")).await.unwrap_err();
    assert!(err.contains("Invalid date"), "{}", err);

    let listed = commands::document::list(state, Some("off"), None).await.unwrap();
    assert_eq!(listed["count"], 1);
    let listed = commands::document::list(state, None, Some(client_id)).await.unwrap();
    assert_eq!(listed["count"], 1);
}

#[tokio::test]
async fn test_back_dated_offer() {
    let env = test_env();
    let state = &env.state;
    let (entity_id, client_id, _, product_id, _) = seed(state).await;

    let offer = commands::offer::create(
        state,
        entity_id,
        client_id,
        vec![product_id],
        vec![],
        None,
        Some("2024-11-05"),
        None,
    )
    .await
    .unwrap();
    assert!(offer["reference"].as_str().unwrap().contains("-2024-11-"));
    assert_eq!(offer["sequenceNumber"], 1);
}
