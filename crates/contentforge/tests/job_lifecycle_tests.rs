//! Job lifecycle: creation, execution, failure recording and retry, for
//! single-item and bundle jobs.

mod common;

use common::{ids, ContentItemBuilder, Reply, TestHarness};
use contentforge::ai::PromptSource;
use contentforge::db::job_repo::JobTarget;
use contentforge::{
    ErrorKind, ForgeError, JobOptions, JobQuery, JobStatus, Page, ProcessingType, SourceType,
};

fn deferred() -> JobOptions {
    JobOptions {
        execute_immediately: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_job_completes_and_result_is_stable() {
    let h = TestHarness::new();
    let content = h.add_content(
        ContentItemBuilder::new("c1")
            .source_type(SourceType::Youtube)
            .text("Transcript of the talk"),
    );
    h.processor.push(Reply::Text("# Summary\nThe talk".to_string()));

    let job = h
        .services
        .jobs
        .create_job(&content, ProcessingType::Summary, "alice", JobOptions::default())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result_path.as_deref(), Some(format!("results/{}.md", job.id).as_str()));
    assert!(h.data_path(job.result_path.as_deref().unwrap()).exists());

    let first = h.services.jobs.get_job_result(&job.id).await.unwrap();
    let second = h.services.jobs.get_job_result(&job.id).await.unwrap();
    assert_eq!(first.as_deref(), Some("# Summary\nThe talk"));
    assert_eq!(first, second);

    let call = h.processor.last_call();
    assert_eq!(call.text, "Transcript of the talk");
    assert_eq!(call.source, PromptSource::Item(SourceType::Youtube));
    assert_eq!(call.language, "en");
    assert!(call.user_prompt.is_none());
}

#[tokio::test]
async fn test_result_is_absent_before_completion() {
    let h = TestHarness::new();
    let content = h.add_content(ContentItemBuilder::new("c1").text("Body"));

    let job = h
        .services
        .jobs
        .create_job(&content, ProcessingType::BlogPost, "alice", deferred())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Pending);
    assert!(h.processor.calls().is_empty());
    assert!(h.services.jobs.get_job_result(&job.id).await.unwrap().is_none());
    assert!(h.services.jobs.get_job_result("missing").await.unwrap().is_none());

    let text = h.services.jobs.execute_job(&job.id).await.unwrap();
    assert_eq!(
        h.services.jobs.get_job_result(&job.id).await.unwrap(),
        Some(text)
    );
}

#[tokio::test]
async fn test_empty_output_is_a_processing_failure() {
    for reply in [Reply::Nothing, Reply::Blank] {
        let h = TestHarness::new();
        let content = h.add_content(ContentItemBuilder::new("c1").text("Body"));
        h.processor.push(reply);

        let job = h
            .services
            .jobs
            .create_job(&content, ProcessingType::Summary, "alice", deferred())
            .await
            .unwrap();
        let err = h.services.jobs.execute_job(&job.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);

        let stored = h.services.jobs.get_job(&job.id, "alice").unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error_message, Some(err.to_string()));
        assert!(stored.result_path.is_none());
    }
}

#[tokio::test]
async fn test_provider_failure_is_recorded_and_create_stays_total() {
    let h = TestHarness::new();
    let content = h.add_content(ContentItemBuilder::new("c1").text("Body"));
    h.processor.push(Reply::Error("overloaded".to_string()));

    let job = h
        .services
        .jobs
        .create_job(&content, ProcessingType::Summary, "alice", JobOptions::default())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.unwrap();
    assert!(message.contains("overloaded"), "message was: {}", message);
}

#[tokio::test]
async fn test_retry_recovers_failed_job() {
    let h = TestHarness::new();
    let content = h.add_content(ContentItemBuilder::new("c1").text("Body"));
    h.processor.push(Reply::Nothing);

    let job = h
        .services
        .jobs
        .create_job(&content, ProcessingType::ContentIdeas, "alice", JobOptions::default())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);

    h.processor.push(Reply::Text("Ideas".to_string()));
    let text = h.services.jobs.retry_job(&job.id).await.unwrap();
    assert_eq!(text, "Ideas");

    let stored = h.services.jobs.get_job(&job.id, "alice").unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(stored.error_message.is_none());
    assert!(stored.result_path.is_some());
}

#[tokio::test]
async fn test_unreadable_text_is_invalid_state() {
    let h = TestHarness::new();
    let never_extracted = h.add_content(ContentItemBuilder::new("c1").without_text_path());
    let file_missing = h.add_content(ContentItemBuilder::new("c2"));

    for content in [never_extracted, file_missing] {
        let job = h
            .services
            .jobs
            .create_job(&content, ProcessingType::Summary, "alice", deferred())
            .await
            .unwrap();
        let err = h.services.jobs.execute_job(&job.id).await.unwrap_err();
        assert!(matches!(err, ForgeError::InvalidState(_)));
        assert_eq!(err.http_status(), 400);

        let stored = h.services.jobs.get_job(&job.id, "alice").unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
    }
    assert!(h.processor.calls().is_empty());
}

#[tokio::test]
async fn test_undecodable_text_is_invalid_state_on_both_paths() {
    let h = TestHarness::new();
    let garbled = h.add_content(ContentItemBuilder::new("c1").title("Garbled"));
    h.write_bytes(&format!("extracted/{}.txt", garbled), &[0xff, 0xfe, 0x00, 0xc3]);
    let readable = h.add_content(ContentItemBuilder::new("c2").title("Readable").text("Body"));

    let job = h
        .services
        .jobs
        .create_job(&garbled, ProcessingType::Summary, "alice", deferred())
        .await
        .unwrap();
    let err = h.services.jobs.execute_job(&job.id).await.unwrap_err();
    assert!(matches!(err, ForgeError::InvalidState(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.http_status(), 400);
    assert!(h.processor.calls().is_empty());

    let bundle = h
        .services
        .bundles
        .create_bundle("alice", vec![garbled, readable], None)
        .unwrap();
    let bundle_job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::Summary,
            "alice",
            JobOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(bundle_job.status, JobStatus::Completed);
    let call = h.processor.last_call();
    assert!(call.text.starts_with("=== SOURCE 1: Readable ==="));
    assert!(!call.text.contains("Garbled"));
}

#[tokio::test]
async fn test_execute_on_wrong_path_leaves_job_untouched() {
    let h = TestHarness::new();
    let c1 = h.add_content(ContentItemBuilder::new("c1").text("Body"));
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", vec![c1.clone()], None)
        .unwrap();

    let bundle_job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::Summary,
            "alice",
            JobOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(bundle_job.status, JobStatus::Completed);

    let err = h.services.jobs.execute_job(&bundle_job.id).await.unwrap_err();
    assert!(matches!(err, ForgeError::InvalidState(_)));
    let stored = h.services.jobs.get_job(&bundle_job.id, "alice").unwrap().unwrap();
    assert_eq!(stored, bundle_job);

    let single = h
        .services
        .jobs
        .create_job(&c1, ProcessingType::Summary, "alice", deferred())
        .await
        .unwrap();
    let err = h.services.jobs.execute_bundle_job(&single.id).await.unwrap_err();
    assert!(matches!(err, ForgeError::InvalidState(_)));
    let stored = h.services.jobs.get_job(&single.id, "alice").unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Pending);
    assert!(stored.error_message.is_none());

    assert_eq!(h.processor.calls().len(), 1);
}

#[tokio::test]
async fn test_custom_prompt_and_language_reach_processor() {
    let h = TestHarness::new();
    let content = h.add_content(ContentItemBuilder::new("c1").text("Body"));

    h.services
        .jobs
        .create_job(
            &content,
            ProcessingType::MvpPlan,
            "alice",
            JobOptions {
                user_prompt: Some("Focus on pricing".to_string()),
                output_language: "de".to_string(),
                execute_immediately: true,
            },
        )
        .await
        .unwrap();

    let call = h.processor.last_call();
    assert_eq!(call.processing_type, ProcessingType::MvpPlan);
    assert_eq!(call.language, "de");
    assert_eq!(call.user_prompt.as_deref(), Some("Focus on pricing"));
}

#[tokio::test]
async fn test_bundle_job_skips_unreadable_items() {
    let h = TestHarness::new();
    let c1 = h.add_content(
        ContentItemBuilder::new("c1")
            .title("First article")
            .url("https://example.com/first")
            .text("First body"),
    );
    let c2 = h.add_content(ContentItemBuilder::new("c2").title("Second article"));
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", vec![c1.clone(), c2.clone()], None)
        .unwrap();

    let job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::Summary,
            "alice",
            JobOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let call = h.processor.last_call();
    assert_eq!(call.source, PromptSource::Bundle);
    assert!(call.text.starts_with("=== SOURCE 1: First article ===\nType: web\nURL: https://example.com/first\n"));
    assert!(call.text.contains("First body"));
    assert!(!call.text.contains("Second article"));
    assert!(!call.text.contains("SOURCE 2"));
}

#[tokio::test]
async fn test_bundle_job_keeps_item_order() {
    let h = TestHarness::new();
    for (id, title) in [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma")] {
        h.add_content(ContentItemBuilder::new(id).title(title).text(&format!("{} text", title)));
    }
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", ids(&["c", "a", "b"]), None)
        .unwrap();

    h.services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::BlogPost,
            "alice",
            JobOptions::default(),
        )
        .await
        .unwrap();

    let text = h.processor.last_call().text;
    let gamma = text.find("=== SOURCE 1: Gamma ===").unwrap();
    let alpha = text.find("=== SOURCE 2: Alpha ===").unwrap();
    let beta = text.find("=== SOURCE 3: Beta ===").unwrap();
    assert!(gamma < alpha && alpha < beta);
}

#[tokio::test]
async fn test_bundle_job_without_readable_items_fails() {
    let h = TestHarness::new();
    let c1 = h.add_content(ContentItemBuilder::new("c1").without_text_path());
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", vec![c1, "deleted".to_string()], None)
        .unwrap();

    let job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::Summary,
            "alice",
            deferred(),
        )
        .await
        .unwrap();

    let err = h.services.jobs.execute_bundle_job(&job.id).await.unwrap_err();
    assert!(matches!(err, ForgeError::InvalidState(_)));
    let stored = h.services.jobs.get_job(&job.id, "alice").unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(h.processor.calls().is_empty());
}

#[tokio::test]
async fn test_bundle_job_with_empty_snapshot_fails() {
    let h = TestHarness::new();
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", ids(&["c1"]), None)
        .unwrap();

    let job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            Vec::new(),
            ProcessingType::Summary,
            "alice",
            JobOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("no content ids"));
}

#[tokio::test]
async fn test_bundle_job_requires_owned_bundle() {
    let h = TestHarness::new();
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", ids(&["c1"]), None)
        .unwrap();

    let err = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            ids(&["c1"]),
            ProcessingType::Summary,
            "bob",
            JobOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_retry_dispatches_bundle_jobs_to_bundle_path() {
    let h = TestHarness::new();
    let c1 = h.add_content(ContentItemBuilder::new("c1").title("Only").text("Body"));
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", vec![c1], None)
        .unwrap();
    h.processor.push(Reply::Error("timeout".to_string()));

    let job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::Summary,
            "alice",
            JobOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);

    h.services.jobs.retry_job(&job.id).await.unwrap();

    let calls = h.processor.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.source == PromptSource::Bundle));
    assert!(calls[1].text.starts_with("=== SOURCE 1: Only ==="));
}

#[tokio::test]
async fn test_bundle_job_keeps_its_snapshot() {
    let h = TestHarness::new();
    let bundle = h
        .services
        .bundles
        .create_bundle("alice", ids(&["c1", "c2"]), None)
        .unwrap();
    let job = h
        .services
        .jobs
        .create_bundle_job(
            &bundle.id,
            bundle.content_ids.clone(),
            ProcessingType::Summary,
            "alice",
            deferred(),
        )
        .await
        .unwrap();

    h.services
        .bundles
        .update_bundle(&bundle.id, "alice", None, Some(&ids(&["c3"])))
        .unwrap();

    let stored = h.services.jobs.get_job(&job.id, "alice").unwrap().unwrap();
    assert_eq!(
        stored.target,
        JobTarget::Bundle {
            bundle_id: Some(bundle.id.clone()),
            content_ids: ids(&["c1", "c2"]),
        }
    );
}

#[tokio::test]
async fn test_user_jobs_are_filtered_and_paginated() {
    let h = TestHarness::new();
    let c1 = h.add_content(ContentItemBuilder::new("c1").text("One"));
    let c2 = h.add_content(ContentItemBuilder::new("c2").text("Two"));
    h.processor.push(Reply::Text("ok".to_string()));
    h.processor.push(Reply::Nothing);

    let jobs = &h.services.jobs;
    let first = jobs
        .create_job(&c1, ProcessingType::Summary, "alice", JobOptions::default())
        .await
        .unwrap();
    let second = jobs
        .create_job(&c2, ProcessingType::Summary, "alice", JobOptions::default())
        .await
        .unwrap();
    let third = jobs
        .create_job(&c1, ProcessingType::Summary, "alice", deferred())
        .await
        .unwrap();
    jobs.create_job(&c1, ProcessingType::Summary, "bob", deferred())
        .await
        .unwrap();

    let (all, total) = jobs.get_user_jobs("alice", &JobQuery::default()).unwrap();
    assert_eq!(total, 3);
    let order: Vec<&str> = all.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(order, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);

    let failed = JobQuery {
        status: Some(JobStatus::Failed),
        ..Default::default()
    };
    let (items, total) = jobs.get_user_jobs("alice", &failed).unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].id, second.id);

    let for_c1 = JobQuery {
        content_id: Some(c1.clone()),
        page: Page::new(1, 1),
        ..Default::default()
    };
    let (items, total) = jobs.get_user_jobs("alice", &for_c1).unwrap();
    assert_eq!(total, 2);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, first.id);

    assert!(jobs.get_job(&first.id, "bob").unwrap().is_none());
    assert!(!jobs.delete_job(&first.id, "bob").unwrap());
    assert!(jobs.delete_job(&first.id, "alice").unwrap());
    assert!(jobs.get_job(&first.id, "alice").unwrap().is_none());
}
