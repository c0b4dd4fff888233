//! Integration tests for reference numbering and the document cascade,
//! run against in-memory SQLite databases.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use docflow_core::models::{
    AddParticipantInput, CertificateUpdate, CreateCategoryInput, CreateClientInput,
    CreateOfferInput, CreateProductInput, CreateSiteInput, Document, DocumentKind, DocumentStatus,
    TransitionContext,
};
use docflow_core::reference::parse_reference;
use docflow_core::{AppState, AppStateInner, Database, DocflowConfig, DocflowError};

struct Fixture {
    state: AppState,
    entity_id: i64,
    client_id: i64,
    site_ids: Vec<i64>,
    /// Two non-training products.
    service_ids: Vec<i64>,
    training_id: i64,
}

async fn fixture_with(config: DocflowConfig) -> Fixture {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let state: AppState = Arc::new(AppStateInner::new(db, config));

    let entity = state.entity_store.create("ACM", "Acme Services").await.unwrap();
    let client = state
        .client_store
        .create(CreateClientInput {
            name: "Globex".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut site_ids = Vec::new();
    for name in ["Plant A", "Plant B"] {
        let site = state
            .client_store
            .create_site(CreateSiteInput {
                client_id: client.id,
                name: name.to_string(),
                location: None,
                description: None,
            })
            .await
            .unwrap();
        site_ids.push(site.id);
    }

    let inspections = state
        .catalog_store
        .create_category(CreateCategoryInput {
            entity_id: entity.id,
            code: "INS".to_string(),
            name: "Inspections".to_string(),
            description: None,
        })
        .await
        .unwrap();
    let training = state
        .catalog_store
        .create_category(CreateCategoryInput {
            entity_id: entity.id,
            code: "FOR".to_string(),
            name: "Training".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let mut service_ids = Vec::new();
    for (code, price) in [("VTE1", 10_000), ("VTE2", 25_000)] {
        let product = state
            .catalog_store
            .create_product(CreateProductInput {
                category_id: inspections.id,
                code: code.to_string(),
                name: format!("Inspection {}", code),
                description: None,
                standard_price_cents: price,
            })
            .await
            .unwrap();
        service_ids.push(product.id);
    }
    let training_product = state
        .catalog_store
        .create_product(CreateProductInput {
            category_id: training.id,
            code: "EC1".to_string(),
            name: "Fire safety".to_string(),
            description: None,
            standard_price_cents: 50_000,
        })
        .await
        .unwrap();

    Fixture {
        state,
        entity_id: entity.id,
        client_id: client.id,
        site_ids,
        service_ids,
        training_id: training_product.id,
    }
}

async fn fixture() -> Fixture {
    fixture_with(DocflowConfig::default()).await
}

impl Fixture {
    async fn offer(&self, product_ids: Vec<i64>) -> Document {
        self.state
            .workflow
            .create_offer(
                CreateOfferInput {
                    entity_id: self.entity_id,
                    client_id: self.client_id,
                    product_ids,
                    site_ids: self.site_ids.clone(),
                    ..Default::default()
                },
                TransitionContext::by("alice"),
            )
            .await
            .unwrap()
    }

    /// Send and validate `id`, returning what the cascade created.
    async fn send_and_validate(&self, id: i64) -> Vec<Document> {
        let wf = &self.state.workflow;
        wf.transition(id, DocumentStatus::Sent, TransitionContext::default())
            .await
            .unwrap();
        wf.validate(id, TransitionContext::default())
            .await
            .unwrap()
            .cascade
            .documents
    }

    /// Drive a fresh offer all the way to an in-progress business case.
    async fn business_case(&self, product_ids: Vec<i64>) -> Document {
        let offer = self.offer(product_ids).await;
        let proforma = self.send_and_validate(offer.id).await.remove(0);
        self.send_and_validate(proforma.id).await.remove(0)
    }
}

#[tokio::test]
async fn test_offer_reference_and_amount() {
    let fx = fixture().await;
    let offer = fx.offer(fx.service_ids.clone()).await;

    assert_eq!(offer.kind, DocumentKind::Offer);
    assert_eq!(offer.status, DocumentStatus::Draft);
    assert_eq!(offer.amount_cents, 35_000);
    assert_eq!(offer.sequence_number, 1);

    let parsed = parse_reference(&offer.reference).unwrap();
    assert_eq!(parsed.entity_code, "ACM");
    assert_eq!(parsed.kind, DocumentKind::Offer);
    assert!(parsed.context_ids.is_empty());
    assert_eq!(parsed.client_id, fx.client_id);
    assert_eq!(parsed.client_count, 1);
    assert_eq!(parsed.sequence, 1);
    assert!(offer.reference.ends_with("-0001"));

    let products = fx.state.document_store.offer_products(offer.id).await.unwrap();
    assert_eq!(products.len(), 2);
    let sites = fx.state.document_store.offer_sites(offer.id).await.unwrap();
    assert_eq!(sites.len(), 2);
}

#[tokio::test]
async fn test_sequence_increments_and_client_count() {
    let fx = fixture().await;
    let first = fx.offer(vec![fx.service_ids[0]]).await;
    let second = fx.offer(vec![fx.service_ids[1]]).await;

    assert_eq!(first.sequence_number, 1);
    assert_eq!(second.sequence_number, 2);
    assert_eq!(parse_reference(&second.reference).unwrap().client_count, 2);
    assert_ne!(first.reference, second.reference);
}

#[tokio::test]
async fn test_sequence_resets_monthly() {
    let fx = fixture().await;
    let create = |created_at| CreateOfferInput {
        entity_id: fx.entity_id,
        client_id: fx.client_id,
        product_ids: vec![fx.service_ids[0]],
        created_at: Some(created_at),
        ..Default::default()
    };
    let jan = Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap();
    let feb = Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap();
    let wf = &fx.state.workflow;

    let a = wf.create_offer(create(jan), TransitionContext::default()).await.unwrap();
    let b = wf.create_offer(create(jan), TransitionContext::default()).await.unwrap();
    let c = wf.create_offer(create(feb), TransitionContext::default()).await.unwrap();

    assert_eq!((a.sequence_number, b.sequence_number, c.sequence_number), (1, 2, 1));
    assert_eq!(c.period(), (2025, 2));
    assert!(a.reference.contains("-2025-01-"));
    assert!(c.reference.contains("-2025-02-"));
}

#[tokio::test]
async fn test_sequences_are_independent_per_entity() {
    let fx = fixture().await;
    let other = fx.state.entity_store.create("BTX", "Beta Tech").await.unwrap();
    let category = fx
        .state
        .catalog_store
        .create_category(CreateCategoryInput {
            entity_id: other.id,
            code: "INS".to_string(),
            name: "Inspections".to_string(),
            description: None,
        })
        .await
        .unwrap();
    let product = fx
        .state
        .catalog_store
        .create_product(CreateProductInput {
            category_id: category.id,
            code: "VTE1".to_string(),
            name: "Inspection".to_string(),
            description: None,
            standard_price_cents: 1_000,
        })
        .await
        .unwrap();

    fx.offer(vec![fx.service_ids[0]]).await;
    fx.offer(vec![fx.service_ids[0]]).await;
    let beta = fx
        .state
        .workflow
        .create_offer(
            CreateOfferInput {
                entity_id: other.id,
                client_id: fx.client_id,
                product_ids: vec![product.id],
                ..Default::default()
            },
            TransitionContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(beta.sequence_number, 1);
    assert!(beta.reference.starts_with("BTX-OFF-"));
}

#[tokio::test]
async fn test_concurrent_creation_yields_unique_sequences() {
    let fx = fixture().await;
    let mut handles = Vec::new();
    for _ in 0..20 {
        let state = fx.state.clone();
        let input = CreateOfferInput {
            entity_id: fx.entity_id,
            client_id: fx.client_id,
            product_ids: vec![fx.service_ids[0]],
            ..Default::default()
        };
        handles.push(tokio::spawn(async move {
            state
                .workflow
                .create_offer(input, TransitionContext::default())
                .await
        }));
    }

    let mut sequences = Vec::new();
    let mut references = HashSet::new();
    for handle in handles {
        let offer = handle.await.unwrap().unwrap();
        sequences.push(offer.sequence_number);
        references.insert(offer.reference);
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=20).collect::<Vec<u32>>());
    assert_eq!(references.len(), 20);
}

#[tokio::test]
async fn test_reference_is_immutable() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;

    let result = fx.state.db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET reference = 'HACKED' WHERE id = ?1",
            rusqlite::params![offer.id],
        )
    });
    assert!(result.is_err());

    // Status updates on the same row still go through.
    fx.state
        .workflow
        .transition(offer.id, DocumentStatus::Sent, TransitionContext::default())
        .await
        .unwrap();
    let reloaded = fx.state.document_store.get(offer.id).await.unwrap().unwrap();
    assert_eq!(reloaded.reference, offer.reference);
    assert_eq!(reloaded.status, DocumentStatus::Sent);
}

#[tokio::test]
async fn test_offer_validation_creates_one_proforma() {
    let fx = fixture().await;
    let offer = fx.offer(fx.service_ids.clone()).await;
    let created = fx.send_and_validate(offer.id).await;

    assert_eq!(created.len(), 1);
    let proforma = &created[0];
    assert_eq!(proforma.kind, DocumentKind::Proforma);
    assert_eq!(proforma.status, DocumentStatus::Draft);
    assert_eq!(proforma.amount_cents, offer.amount_cents);
    assert_eq!(proforma.links.offer_id, Some(offer.id));
    assert_eq!(
        parse_reference(&proforma.reference).unwrap().context_ids,
        vec![offer.id]
    );

    let validated = fx.state.document_store.get(offer.id).await.unwrap().unwrap();
    assert_eq!(validated.status, DocumentStatus::Validated);
    assert!(validated.validated_at.is_some());

    // Validating again is not a legal move and spawns nothing.
    let err = fx
        .state
        .workflow
        .validate(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::InvalidTransition(_)));

    // Neither does an explicit cascade on the already-cascaded offer.
    let err = fx
        .state
        .workflow
        .cascade(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)));

    let children = fx.state.document_store.list_children(offer.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(fx.state.document_store.list_by_kind(DocumentKind::Proforma).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cascade_from_unvalidated_document_creates_nothing() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;

    let err = fx
        .state
        .workflow
        .cascade(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)));

    let err = fx
        .state
        .workflow
        .validate(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::InvalidTransition(_)));

    assert!(fx.state.document_store.list_children(offer.id).await.unwrap().is_empty());
    let offer = fx.state.document_store.get(offer.id).await.unwrap().unwrap();
    assert_eq!(offer.status, DocumentStatus::Draft);
}

#[tokio::test]
async fn test_cascade_after_completion_reports_existing_child() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;
    fx.send_and_validate(offer.id).await;
    fx.state
        .workflow
        .complete(offer.id, TransitionContext::default())
        .await
        .unwrap();

    let err = fx
        .state
        .workflow
        .cascade(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)), "{}", err);
    assert_eq!(fx.state.document_store.list_children(offer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cascade_requires_validation_date() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;
    fx.state
        .db
        .with_conn(|conn| {
            conn.execute(
                "UPDATE documents SET status = 'VALIDATED', validated_at = NULL WHERE id = ?1",
                rusqlite::params![offer.id],
            )
        })
        .unwrap();

    let err = fx
        .state
        .workflow
        .cascade(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)), "{}", err);
    assert!(err.to_string().contains("no validation date"));
    assert!(fx.state.document_store.list_children(offer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_cascade_rolls_back_status_change() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;
    fx.state
        .workflow
        .transition(offer.id, DocumentStatus::Sent, TransitionContext::default())
        .await
        .unwrap();

    // A proforma that already points at the offer makes the cascade conflict.
    let now = Utc::now().timestamp_millis();
    fx.state
        .db
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (kind, entity_id, client_id, reference, status, sequence_number,
                                        period_year, period_month, offer_id, created_at, updated_at)
                 VALUES ('PRO', ?1, ?2, 'LEGACY-PRO-1', 'DRAFT', 999, 1999, 1, ?3, ?4, ?4)",
                rusqlite::params![fx.entity_id, fx.client_id, offer.id, now],
            )
        })
        .unwrap();

    let err = fx
        .state
        .workflow
        .validate(offer.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)));

    let offer = fx.state.document_store.get(offer.id).await.unwrap().unwrap();
    assert_eq!(offer.status, DocumentStatus::Sent);
    assert!(offer.validated_at.is_none());
    let history = fx.state.history_store.list_for_document(offer.id).await.unwrap();
    assert!(history.iter().all(|h| h.new_status != "VALIDATED"));
}

#[tokio::test]
async fn test_proforma_validation_opens_business_case() {
    let fx = fixture().await;
    let offer = fx.offer(fx.service_ids.clone()).await;
    let case = fx.business_case(fx.service_ids.clone()).await;
    assert_eq!(case.kind, DocumentKind::BusinessCase);
    assert_eq!(case.status, DocumentStatus::InProgress);
    assert_eq!(case.amount_cents, offer.amount_cents);
    assert!(case.links.offer_id.is_some());
    assert!(case.links.proforma_id.is_some());
}

#[tokio::test]
async fn test_business_case_completion_creates_invoice_and_reports() {
    let fx = fixture().await;
    let case = fx.business_case(fx.service_ids.clone()).await;

    let outcome = fx
        .state
        .workflow
        .complete(case.id, TransitionContext::by("bob"))
        .await
        .unwrap();
    assert_eq!(outcome.document.status, DocumentStatus::Completed);
    assert!(outcome.document.completed_at.is_some());

    let created = &outcome.cascade.documents;
    let invoices: Vec<_> = created.iter().filter(|d| d.kind == DocumentKind::Invoice).collect();
    let reports: Vec<_> = created.iter().filter(|d| d.kind == DocumentKind::Report).collect();
    assert_eq!(invoices.len(), 1);
    assert_eq!(reports.len(), fx.site_ids.len() * fx.service_ids.len());
    assert!(outcome.cascade.training_sessions.is_empty());

    assert_eq!(invoices[0].amount_cents, case.amount_cents);
    assert!(invoices[0].due_on.is_none());
    let pairs: HashSet<_> = reports
        .iter()
        .map(|r| (r.links.site_id.unwrap(), r.links.product_id.unwrap()))
        .collect();
    assert_eq!(pairs.len(), 4);
    let report_seqs: HashSet<_> = reports.iter().map(|r| r.sequence_number).collect();
    assert_eq!(report_seqs.len(), 4);

    let children = fx.state.document_store.list_children(case.id).await.unwrap();
    assert_eq!(children.len(), 5);

    let err = fx
        .state
        .workflow
        .cascade(case.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)));
}

#[tokio::test]
async fn test_training_product_spawns_one_session() {
    let fx = fixture().await;
    let mut products = fx.service_ids.clone();
    products.push(fx.training_id);
    let case = fx.business_case(products).await;

    let outcome = fx
        .state
        .workflow
        .complete(case.id, TransitionContext::default())
        .await
        .unwrap();
    let sessions = &outcome.cascade.training_sessions;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].product_id, fx.training_id);
    assert_eq!(sessions[0].business_case_id, case.id);
    assert_eq!(sessions[0].title, "Training Fire safety");

    let reports = outcome
        .cascade
        .documents
        .iter()
        .filter(|d| d.kind == DocumentKind::Report)
        .count();
    assert_eq!(reports, fx.site_ids.len() * 3);

    let listed = fx.state.training_store.list_sessions(case.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_configured_training_category_and_payment_terms() {
    let config = DocflowConfig {
        training_category_code: "INS".to_string(),
        invoice_payment_terms_days: Some(30),
        ..Default::default()
    };
    let fx = fixture_with(config).await;
    let case = fx.business_case(fx.service_ids.clone()).await;

    let outcome = fx
        .state
        .workflow
        .complete(case.id, TransitionContext::default())
        .await
        .unwrap();
    assert_eq!(outcome.cascade.training_sessions.len(), 2);

    let invoice = outcome
        .cascade
        .documents
        .iter()
        .find(|d| d.kind == DocumentKind::Invoice)
        .unwrap();
    let due = invoice.due_on.unwrap();
    assert_eq!((due - invoice.created_at.date_naive()).num_days(), 30);
}

#[tokio::test]
async fn test_cancelled_business_case_spawns_nothing() {
    let fx = fixture().await;
    let case = fx.business_case(fx.service_ids.clone()).await;
    let outcome = fx
        .state
        .workflow
        .transition(case.id, DocumentStatus::Cancelled, TransitionContext::default())
        .await
        .unwrap();
    assert!(outcome.cascade.documents.is_empty());

    let err = fx
        .state
        .workflow
        .complete(case.id, TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_history_records_creation_and_transitions() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;
    fx.state
        .workflow
        .transition(
            offer.id,
            DocumentStatus::Sent,
            TransitionContext::by("alice").with_comment("emailed"),
        )
        .await
        .unwrap();

    let history = fx.state.history_store.list_for_document(offer.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].old_status, "");
    assert_eq!(history[0].new_status, "DRAFT");
    assert_eq!(history[1].old_status, "DRAFT");
    assert_eq!(history[1].new_status, "SENT");
    assert_eq!(history[1].changed_by.as_deref(), Some("alice"));
    assert_eq!(history[1].comment.as_deref(), Some("emailed"));
}

#[tokio::test]
async fn test_history_can_be_disabled() {
    let config = DocflowConfig {
        record_history: false,
        ..Default::default()
    };
    let fx = fixture_with(config).await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;
    fx.send_and_validate(offer.id).await;
    assert!(fx.state.history_store.list_for_document(offer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_offer_input_validation() {
    let fx = fixture().await;
    let wf = &fx.state.workflow;

    let err = wf
        .create_offer(
            CreateOfferInput {
                entity_id: fx.entity_id,
                client_id: fx.client_id,
                ..Default::default()
            },
            TransitionContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)));

    let stranger = fx
        .state
        .client_store
        .create(CreateClientInput {
            name: "Initech".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let err = wf
        .create_offer(
            CreateOfferInput {
                entity_id: fx.entity_id,
                client_id: stranger.id,
                product_ids: vec![fx.service_ids[0]],
                site_ids: vec![fx.site_ids[0]],
                ..Default::default()
            },
            TransitionContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)));

    let other = fx.state.entity_store.create("BTX", "Beta Tech").await.unwrap();
    let err = wf
        .create_offer(
            CreateOfferInput {
                entity_id: other.id,
                client_id: fx.client_id,
                product_ids: vec![fx.service_ids[0]],
                ..Default::default()
            },
            TransitionContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)));

    let err = wf
        .create_offer(
            CreateOfferInput {
                entity_id: fx.entity_id,
                client_id: 9_999,
                product_ids: vec![fx.service_ids[0]],
                ..Default::default()
            },
            TransitionContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::NotFound(_)));

    // Nothing was persisted by the rejected attempts.
    assert!(fx.state.document_store.list_by_kind(DocumentKind::Offer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_comments_editable_only_in_draft() {
    let fx = fixture().await;
    let offer = fx.offer(vec![fx.service_ids[0]]).await;
    let wf = &fx.state.workflow;

    let updated = wf
        .update_comments(offer.id, Some("Call back Monday".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.comments.as_deref(), Some("Call back Monday"));

    wf.transition(offer.id, DocumentStatus::Sent, TransitionContext::default())
        .await
        .unwrap();
    let err = wf.update_comments(offer.id, None).await.unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)));
}

#[tokio::test]
async fn test_planned_end_and_invoice_payment() {
    let fx = fixture().await;
    let case = fx.business_case(fx.service_ids.clone()).await;
    let wf = &fx.state.workflow;

    let too_early = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    assert!(wf.set_planned_end(case.id, too_early).await.is_err());
    let planned = Utc::now().date_naive() + chrono::Duration::days(10);
    let updated = wf.set_planned_end(case.id, planned).await.unwrap();
    assert_eq!(updated.planned_end_on, Some(planned));

    let outcome = wf.complete(case.id, TransitionContext::default()).await.unwrap();
    let invoice = outcome
        .cascade
        .documents
        .into_iter()
        .find(|d| d.kind == DocumentKind::Invoice)
        .unwrap();

    // Only invoices can be paid.
    let err = wf.mark_invoice_paid(case.id, None).await.unwrap_err();
    assert!(matches!(err, DocflowError::Validation(_)));

    let paid = wf.mark_invoice_paid(invoice.id, None).await.unwrap();
    assert!(paid.is_paid());
    assert_eq!(paid.paid_on, Some(Utc::now().date_naive()));

    let err = wf.mark_invoice_paid(invoice.id, None).await.unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)));
}

#[tokio::test]
async fn test_participants_scores_and_certificates() {
    let fx = fixture().await;
    let case = fx.business_case(vec![fx.training_id]).await;
    let outcome = fx
        .state
        .workflow
        .complete(case.id, TransitionContext::default())
        .await
        .unwrap();
    let session = outcome.cascade.training_sessions[0].clone();
    let training = &fx.state.training_store;

    let ana = training
        .add_participant(
            session.id,
            AddParticipantInput {
                last_name: "Lopez".to_string(),
                first_name: "Ana".to_string(),
                email: Some("ana@globex.test".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let ben = training
        .add_participant(
            session.id,
            AddParticipantInput {
                last_name: "Okafor".to_string(),
                first_name: "Ben".to_string(),
                email: Some("ben@globex.test".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = training
        .add_participant(
            session.id,
            AddParticipantInput {
                last_name: "Lopez".to_string(),
                first_name: "Ana".to_string(),
                email: Some("ana@globex.test".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)));

    assert!(training.score_participant(ana.id, 21.0, None).await.is_err());
    training.score_participant(ana.id, 15.5, None).await.unwrap();
    let updated = training
        .score_participant(ben.id, 12.0, Some("Needs practice".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.average_score, Some(13.75));
    assert_eq!(training.list_participants(session.id).await.unwrap().len(), 2);

    let wf = &fx.state.workflow;
    let certificate = wf
        .issue_certificate(ana.id, "Fire safety, level 1".to_string(), TransitionContext::default())
        .await
        .unwrap();
    assert_eq!(certificate.kind, DocumentKind::TrainingCertificate);
    assert_eq!(certificate.status, DocumentStatus::Draft);
    assert_eq!(
        parse_reference(&certificate.reference).unwrap().context_ids,
        vec![case.id, session.id, ana.id]
    );

    let err = wf
        .issue_certificate(ana.id, "Again".to_string(), TransitionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocflowError::Conflict(_)));

    assert!(!wf.certificate_is_complete(certificate.id).await.unwrap());
    let details = wf
        .update_certificate(
            certificate.id,
            CertificateUpdate {
                skills_acquired: Some("Extinguisher handling".to_string()),
                evaluation_result: Some("Passed".to_string()),
                trainer_signed: Some(true),
                participant_signed: Some(true),
            },
        )
        .await
        .unwrap();
    assert!(details.is_complete());
    assert!(wf.certificate_is_complete(certificate.id).await.unwrap());
}

#[tokio::test]
async fn test_session_schedule() {
    let fx = fixture().await;
    let case = fx.business_case(vec![fx.training_id]).await;
    let outcome = fx
        .state
        .workflow
        .complete(case.id, TransitionContext::default())
        .await
        .unwrap();
    let session = &outcome.cascade.training_sessions[0];

    let start = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 6, 2, 16, 30, 0).unwrap();
    let training = &fx.state.training_store;
    assert!(training
        .update_schedule(session.id, None, end, start)
        .await
        .is_err());
    let updated = training
        .update_schedule(session.id, Some("M. Durand".to_string()), start, end)
        .await
        .unwrap();
    assert_eq!(updated.trainer.as_deref(), Some("M. Durand"));
    assert!((updated.duration_hours() - 7.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_pipeline_summary() {
    let fx = fixture().await;
    let case = fx.business_case(fx.service_ids.clone()).await;
    fx.state
        .workflow
        .complete(case.id, TransitionContext::default())
        .await
        .unwrap();

    let summary = fx.state.document_store.summary().await.unwrap();
    assert_eq!(summary.documents_by_kind["OFF"], 1);
    assert_eq!(summary.documents_by_kind["PRO"], 1);
    assert_eq!(summary.documents_by_kind["AFF"], 1);
    assert_eq!(summary.documents_by_kind["FAC"], 1);
    assert_eq!(summary.documents_by_kind["RAP"], 4);
    assert_eq!(summary.documents_by_kind["ATT"], 0);
    assert_eq!(summary.total_documents, 8);
}
