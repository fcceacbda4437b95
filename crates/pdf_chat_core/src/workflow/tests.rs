use bytes::Bytes;
use uuid::Uuid;

use super::*;
use crate::ports::DatabaseService;
use crate::testing::{RecordingStorage, ScriptedCompletion, StaticExtractor, TestHarness};

fn pdf(owner_id: Uuid, text: Option<&str>) -> PdfUpload {
    PdfUpload {
        owner_id,
        file_name: "paper.pdf".to_string(),
        content_type: PDF_CONTENT_TYPE.to_string(),
        bytes: Bytes::from_static(b"%PDF-1.7 fake body"),
        title: Some("A paper".to_string()),
        text_content: text.map(str::to_string),
    }
}

async fn uploaded(harness: &TestHarness, owner_id: Uuid, text: &str) -> Document {
    harness
        .workflow
        .upload(pdf(owner_id, Some(text)))
        .await
        .expect("upload succeeds")
}

// --- Upload ---

#[tokio::test]
async fn upload_stores_file_and_hides_text_from_result() {
    let harness = TestHarness::replying("ok");
    let owner = Uuid::new_v4();

    let document = uploaded(&harness, owner, "body text").await;

    assert_eq!(document.owner_id, owner);
    assert_eq!(document.title, "A paper");
    assert_eq!(document.original_filename, "paper.pdf");
    assert_eq!(document.url, "https://storage.test/pdfs/paper.pdf");
    assert!(document.text_content.is_none());
    assert!(document.summary.is_empty());
    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.text_content.as_deref(), Some("body text"));
}

#[tokio::test]
async fn upload_falls_back_to_file_name_for_title() {
    let harness = TestHarness::replying("ok");
    let mut upload = pdf(Uuid::new_v4(), Some("x"));
    upload.title = Some("   ".to_string());

    let document = harness.workflow.upload(upload).await.unwrap();
    assert_eq!(document.title, "paper.pdf");
}

#[tokio::test]
async fn upload_rejects_non_pdf_without_writing_anything() {
    let harness = TestHarness::replying("ok");
    let mut upload = pdf(Uuid::new_v4(), Some("x"));
    upload.content_type = "image/png".to_string();

    let err = harness.workflow.upload(upload).await.unwrap_err();

    assert!(matches!(err, WorkflowError::InvalidFileType(ref t) if t == "image/png"));
    assert!(harness.storage.uploads().is_empty());
    assert_eq!(harness.db.document_count(), 0);
}

#[tokio::test]
async fn upload_rejects_files_over_ten_mebibytes_without_writing_anything() {
    let harness = TestHarness::replying("ok");
    let mut upload = pdf(Uuid::new_v4(), Some("x"));
    upload.bytes = Bytes::from(vec![0u8; MAX_UPLOAD_BYTES + 1]);

    let err = harness.workflow.upload(upload).await.unwrap_err();

    assert!(matches!(err, WorkflowError::FileTooLarge { size } if size == MAX_UPLOAD_BYTES + 1));
    assert!(harness.storage.uploads().is_empty());
    assert_eq!(harness.db.document_count(), 0);
}

#[tokio::test]
async fn upload_accepts_a_file_of_exactly_the_limit() {
    let harness = TestHarness::replying("ok");
    let mut upload = pdf(Uuid::new_v4(), Some("x"));
    upload.bytes = Bytes::from(vec![0u8; MAX_UPLOAD_BYTES]);

    assert!(harness.workflow.upload(upload).await.is_ok());
}

#[tokio::test]
async fn upload_rejects_overlong_titles() {
    let harness = TestHarness::replying("ok");
    let mut upload = pdf(Uuid::new_v4(), Some("x"));
    upload.title = Some("t".repeat(MAX_TITLE_CHARS + 1));

    let err = harness.workflow.upload(upload).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
    assert!(harness.storage.uploads().is_empty());
}

#[tokio::test]
async fn storage_failure_is_reported_with_provider_message_and_no_document() {
    let harness = TestHarness::new(
        RecordingStorage::failing("Invalid Signature abc"),
        ScriptedCompletion::replying("ok"),
        StaticExtractor::failing(),
    );

    let err = harness
        .workflow
        .upload(pdf(Uuid::new_v4(), Some("x")))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::StorageUploadFailed(ref m) if m == "Invalid Signature abc"
    ));
    assert_eq!(harness.db.document_count(), 0);
}

#[tokio::test]
async fn upload_extracts_text_when_client_sent_none() {
    let harness = TestHarness::new(
        RecordingStorage::new(),
        ScriptedCompletion::replying("ok"),
        StaticExtractor::with_text("extracted words"),
    );

    let document = harness
        .workflow
        .upload(pdf(Uuid::new_v4(), None))
        .await
        .unwrap();

    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.text_content.as_deref(), Some("extracted words"));
}

#[tokio::test]
async fn failed_extraction_still_stores_the_document() {
    let harness = TestHarness::replying("ok");

    let document = harness
        .workflow
        .upload(pdf(Uuid::new_v4(), None))
        .await
        .unwrap();

    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.text_content.as_deref(), Some(""));
}

#[tokio::test]
async fn empty_text_sent_by_the_client_is_kept_and_not_extracted() {
    let harness = TestHarness::new(
        RecordingStorage::new(),
        ScriptedCompletion::replying("answer"),
        StaticExtractor::with_text("server extracted text"),
    );
    let owner = Uuid::new_v4();

    let document = harness.workflow.upload(pdf(owner, Some(""))).await.unwrap();

    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.text_content.as_deref(), Some(""));
    let ask = harness.workflow.ask_question(document.id, owner, "q").await;
    assert!(matches!(ask, Err(WorkflowError::EmptyDocumentText)));
    assert_eq!(harness.completion.call_count(), 0);
}

// --- AskQuestion ---

#[tokio::test]
async fn asking_records_an_exchange_and_links_it_to_the_document() {
    let harness = TestHarness::replying("It is about rust.");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "Rust ownership rules").await;

    let exchange = harness
        .workflow
        .ask_question(document.id, owner, "What is this about?")
        .await
        .unwrap();

    assert_eq!(exchange.document_id, document.id);
    assert_eq!(exchange.account_id, owner);
    assert_eq!(exchange.question, "What is this about?");
    assert_eq!(exchange.response, "It is about rust.");
    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.exchange_ids, vec![exchange.id]);

    let prompt = &harness.completion.prompts()[0];
    assert!(prompt.contains("Rust ownership rules"));
    assert!(prompt.contains("Current question: What is this about?"));
}

#[tokio::test]
async fn question_is_stored_as_sent() {
    let harness = TestHarness::replying("answer");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;

    let exchange = harness
        .workflow
        .ask_question(document.id, owner, "  What is this?\n")
        .await
        .unwrap();

    assert_eq!(exchange.question, "  What is this?\n");
    assert_eq!(harness.db.exchanges_for(document.id)[0].question, "  What is this?\n");
}

#[tokio::test]
async fn asking_the_same_question_twice_creates_two_exchanges() {
    let harness = TestHarness::replying("answer");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;

    let first = harness.workflow.ask_question(document.id, owner, "same?").await.unwrap();
    assert_eq!(harness.db.exchanges_for(document.id).len(), 1);
    let second = harness.workflow.ask_question(document.id, owner, "same?").await.unwrap();
    assert_eq!(harness.db.exchanges_for(document.id).len(), 2);

    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn only_the_two_most_recent_exchanges_are_replayed_in_chronological_order() {
    let harness = TestHarness::replying("answer");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;

    for n in 1..=5 {
        harness
            .workflow
            .ask_question(document.id, owner, &format!("question {n}"))
            .await
            .unwrap();
    }
    harness
        .workflow
        .ask_question(document.id, owner, "question 6")
        .await
        .unwrap();

    let prompts = harness.completion.prompts();
    let sixth = &prompts[5];
    assert!(sixth.contains(
        "Previous conversation:\n\
         Question: question 4\nAnswer: answer\n\n\
         Question: question 5\nAnswer: answer\n"
    ));
    for old in ["question 1", "question 2", "question 3"] {
        assert!(!sixth.contains(old), "{old} leaked into the prompt");
    }
}

#[tokio::test]
async fn first_question_has_an_empty_history_block() {
    let harness = TestHarness::replying("answer");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;

    harness.workflow.ask_question(document.id, owner, "hi").await.unwrap();

    assert!(harness.completion.prompts()[0].contains("Previous conversation:\n\n"));
}

#[tokio::test]
async fn blank_question_is_a_validation_error_without_lookups() {
    let harness = TestHarness::replying("answer");

    let err = harness
        .workflow
        .ask_question(Uuid::new_v4(), Uuid::new_v4(), "   ")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
    assert_eq!(harness.completion.call_count(), 0);
}

#[tokio::test]
async fn completion_failure_is_surfaced_and_nothing_is_recorded() {
    let harness = TestHarness::new(
        RecordingStorage::new(),
        ScriptedCompletion::failing("quota exceeded"),
        StaticExtractor::failing(),
    );
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;

    let err = harness
        .workflow
        .ask_question(document.id, owner, "why?")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Completion(ref m) if m == "quota exceeded"));
    assert_eq!(harness.completion.call_count(), 1);
    assert!(harness.db.exchanges_for(document.id).is_empty());
}

#[tokio::test]
async fn empty_text_blocks_every_completion_operation() {
    let harness = TestHarness::replying("answer");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "").await;

    let ask = harness.workflow.ask_question(document.id, owner, "q").await;
    let summary = harness.workflow.summarize(document.id, owner).await;
    let flow = harness.workflow.generate_flow(document.id, owner).await;

    assert!(matches!(ask, Err(WorkflowError::EmptyDocumentText)));
    assert!(matches!(summary, Err(WorkflowError::EmptyDocumentText)));
    assert!(matches!(flow, Err(WorkflowError::EmptyDocumentText)));
    assert_eq!(harness.completion.call_count(), 0);
}

// --- Summarize / Flow ---

#[tokio::test]
async fn summarize_replaces_the_stored_summary() {
    let harness = TestHarness::replying("short version");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "long text").await;

    let first = harness.workflow.summarize(document.id, owner).await.unwrap();
    let second = harness.workflow.summarize(document.id, owner).await.unwrap();

    assert_eq!(first, "short version");
    assert_eq!(second, "short version");
    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.summary, "short version");
    assert_eq!(
        harness.completion.prompts()[0],
        "Please provide a comprehensive summary of the following text: long text"
    );
}

#[tokio::test]
async fn flow_is_generated_every_time_and_never_stored() {
    let harness = TestHarness::replying("A -> B");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "concepts").await;

    harness.workflow.generate_flow(document.id, owner).await.unwrap();
    let flow = harness.workflow.generate_flow(document.id, owner).await.unwrap();

    assert_eq!(flow, "A -> B");
    assert_eq!(harness.completion.call_count(), 2);
    let stored = harness.db.raw_document(document.id).unwrap();
    assert!(stored.summary.is_empty());
    assert!(harness.completion.prompts()[0].contains("structured flow or outline"));
}

// --- Listing ---

#[tokio::test]
async fn exchanges_are_listed_oldest_first() {
    let harness = TestHarness::replying("a");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;
    for q in ["one", "two", "three"] {
        harness.workflow.ask_question(document.id, owner, q).await.unwrap();
    }

    let listed = harness.workflow.list_exchanges(document.id, owner).await.unwrap();
    let questions: Vec<_> = listed.iter().map(|e| e.question.as_str()).collect();
    assert_eq!(questions, ["one", "two", "three"]);
}

#[tokio::test]
async fn documents_are_listed_newest_first_without_text() {
    let harness = TestHarness::replying("a");
    let owner = Uuid::new_v4();
    let older = uploaded(&harness, owner, "old").await;
    let newer = uploaded(&harness, owner, "new").await;
    uploaded(&harness, Uuid::new_v4(), "someone else").await;
    harness.workflow.ask_question(newer.id, owner, "q").await.unwrap();

    let listed = harness.workflow.list_documents(owner).await.unwrap();

    let ids: Vec<_> = listed.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
    assert!(listed.iter().all(|d| d.text_content.is_none()));
    assert_eq!(listed[0].exchange_count(), 1);
    assert_eq!(listed[1].exchange_count(), 0);
}

#[tokio::test]
async fn get_document_returns_its_conversation() {
    let harness = TestHarness::replying("a");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;
    harness.workflow.ask_question(document.id, owner, "q").await.unwrap();

    let detail = harness.workflow.get_document(document.id, owner).await.unwrap();

    assert_eq!(detail.document.id, document.id);
    assert!(detail.document.text_content.is_none());
    assert_eq!(detail.exchanges.len(), 1);
}

// --- Deletion ---

#[tokio::test]
async fn deleting_a_document_cascades_to_its_exchanges() {
    let harness = TestHarness::replying("a");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;
    for q in ["one", "two", "three"] {
        harness.workflow.ask_question(document.id, owner, q).await.unwrap();
    }

    let removed = harness.workflow.delete_document(document.id, owner).await.unwrap();

    assert_eq!(removed, 3);
    assert!(harness.db.exchanges_for(document.id).is_empty());
    assert!(harness.workflow.list_documents(owner).await.unwrap().is_empty());
    let refetch = harness.workflow.get_document(document.id, owner).await;
    assert!(matches!(refetch, Err(WorkflowError::DocumentNotFound)));
}

#[tokio::test]
async fn deleting_an_exchange_unlinks_it_from_the_document() {
    let harness = TestHarness::replying("a");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;
    let keep = harness.workflow.ask_question(document.id, owner, "keep").await.unwrap();
    let dropped = harness.workflow.ask_question(document.id, owner, "drop").await.unwrap();

    harness.workflow.delete_exchange(dropped.id, owner).await.unwrap();

    let stored = harness.db.raw_document(document.id).unwrap();
    assert_eq!(stored.exchange_ids, vec![keep.id]);
    assert_eq!(harness.db.exchanges_for(document.id), vec![keep]);
    let again = harness.workflow.delete_exchange(dropped.id, owner).await;
    assert!(matches!(again, Err(WorkflowError::ExchangeNotFound)));
}

#[tokio::test]
async fn deleting_an_exchange_whose_document_is_gone_reports_not_found() {
    let harness = TestHarness::replying("a");
    let owner = Uuid::new_v4();
    let document = uploaded(&harness, owner, "text").await;
    let exchange = harness.workflow.ask_question(document.id, owner, "q").await.unwrap();
    harness.db.delete_document(document.id).await.unwrap();

    let err = harness.workflow.delete_exchange(exchange.id, owner).await.unwrap_err();
    assert!(matches!(err, WorkflowError::ExchangeNotFound));
}

// --- Ownership isolation ---

#[tokio::test]
async fn another_account_always_sees_not_found() {
    let harness = TestHarness::replying("a");
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let document = uploaded(&harness, alice, "private text").await;
    let exchange = harness.workflow.ask_question(document.id, alice, "mine").await.unwrap();
    let calls_before = harness.completion.call_count();

    let w = &harness.workflow;
    assert!(matches!(w.get_document(document.id, bob).await, Err(WorkflowError::DocumentNotFound)));
    assert!(matches!(
        w.ask_question(document.id, bob, "q").await,
        Err(WorkflowError::DocumentNotFound)
    ));
    assert!(matches!(w.summarize(document.id, bob).await, Err(WorkflowError::DocumentNotFound)));
    assert!(matches!(
        w.generate_flow(document.id, bob).await,
        Err(WorkflowError::DocumentNotFound)
    ));
    assert!(matches!(
        w.list_exchanges(document.id, bob).await,
        Err(WorkflowError::DocumentNotFound)
    ));
    assert!(matches!(
        w.delete_document(document.id, bob).await,
        Err(WorkflowError::DocumentNotFound)
    ));
    assert!(matches!(
        w.delete_exchange(exchange.id, bob).await,
        Err(WorkflowError::ExchangeNotFound)
    ));

    assert_eq!(harness.completion.call_count(), calls_before);
    assert!(harness.db.raw_document(document.id).is_some());
    assert_eq!(harness.db.exchanges_for(document.id).len(), 1);
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let harness = TestHarness::replying("a");
    let err = harness
        .workflow
        .summarize(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DocumentNotFound));
}
