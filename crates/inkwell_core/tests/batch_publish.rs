mod common;

use common::{ids, server_error, FakeChapterApi, RecordingNotifier, ScriptedConfirm, D, P, PROJECT};
use inkwell_core::batch::select::select_through_current;
use inkwell_core::{
    BatchPublisher, CancelFlag, ChapterId, ChapterPublishResult, ChapterStore, ChapterWorkflow,
    EditorEntry, Session,
};

fn loaded_store(api: &FakeChapterApi) -> ChapterStore<&FakeChapterApi> {
    let mut store = ChapterStore::new(api, Session::new());
    store.load_all(PROJECT).unwrap();
    api.clear_calls();
    store
}

#[test]
fn failing_chapter_does_not_stop_the_batch() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, D), (6, 2, D), (7, 3, D)]);
    api.fail_update(6, server_error("500"));
    let mut store = loaded_store(&api);

    let report = BatchPublisher::new().publish(&mut store, &ids(&[5, 6, 7]), |_| {});

    assert_eq!(
        report.results,
        vec![
            ChapterPublishResult {
                chapter_id: ChapterId(5),
                success: true,
                error: None,
            },
            ChapterPublishResult {
                chapter_id: ChapterId(6),
                success: false,
                error: Some("500".to_string()),
            },
            ChapterPublishResult {
                chapter_id: ChapterId(7),
                success: true,
                error: None,
            },
        ]
    );
    assert_eq!(report.success_count, 2);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.skipped_count, 0);
    assert_eq!(report.total_chapters, 3);
    assert_eq!(api.statuses(), vec![(1, P), (2, D), (3, P)]);
}

#[test]
fn counts_add_up_wherever_the_failure_lands() {
    for size in 1..=5_i64 {
        for failing in 1..=size {
            let seed: Vec<_> = (1..=size).map(|n| (n, n, D)).collect();
            let api = FakeChapterApi::with_chapters(&seed);
            api.fail_update(failing, server_error("boom"));
            let mut store = loaded_store(&api);
            let all: Vec<i64> = (1..=size).collect();

            let report = BatchPublisher::new().publish(&mut store, &ids(&all), |_| {});

            assert_eq!(report.success_count + report.error_count, size as usize);
            assert_eq!(report.error_count, 1);
            for (number, status) in api.statuses() {
                let expected = if number == failing { D } else { P };
                assert_eq!(status, expected, "size={size} failing={failing} number={number}");
            }
        }
    }
}

#[test]
fn publishes_one_at_a_time_in_input_order_with_progress() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, D), (6, 2, D), (7, 3, D)]);
    let mut store = loaded_store(&api);
    let mut progress = Vec::new();

    BatchPublisher::new().publish(&mut store, &ids(&[7, 5, 6]), |step| {
        progress.push((step.current, step.total));
    });

    assert_eq!(api.updated_ids(), ids(&[7, 5, 6]));
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn duplicate_ids_are_published_once() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, D), (6, 2, D)]);
    let mut store = loaded_store(&api);

    let report = BatchPublisher::new().publish(&mut store, &ids(&[6, 5, 6, 5]), |_| {});

    assert_eq!(report.total_chapters, 2);
    assert_eq!(api.updated_ids(), ids(&[6, 5]));
}

#[test]
fn ineligible_chapters_fail_without_a_request() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, P), (6, 2, D)]);
    let mut store = loaded_store(&api);

    let report = BatchPublisher::new().publish(&mut store, &ids(&[5, 99, 6]), |_| {});

    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 2);
    let failed: Vec<ChapterId> = report.failed().map(|r| r.chapter_id).collect();
    assert_eq!(failed, ids(&[5, 99]));
    assert_eq!(
        report.results[1].error.as_deref(),
        Some("章节不存在: 99")
    );
    assert_eq!(api.updated_ids(), ids(&[6]));
}

#[test]
fn cancellation_skips_remaining_chapters() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, D), (6, 2, D), (7, 3, D)]);
    let mut store = loaded_store(&api);
    let cancel = CancelFlag::new();

    let report = BatchPublisher::with_cancel(cancel.clone()).publish(
        &mut store,
        &ids(&[5, 6, 7]),
        |_| cancel.cancel(),
    );

    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 0);
    assert_eq!(report.skipped_count, 2);
    assert_eq!(report.results.len(), 1);
    assert_eq!(api.statuses(), vec![(1, P), (2, D), (3, D)]);
}

#[test]
fn workflow_reports_summary_and_reselects() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, D), (6, 2, D), (7, 3, D)]);
    api.fail_update(6, server_error("500"));
    let mut confirm = ScriptedConfirm::default();
    let mut notes = RecordingNotifier::default();

    {
        let store = ChapterStore::new(&api, Session::new());
        let mut workflow = ChapterWorkflow::new(store, &mut confirm, &mut notes);
        workflow.open_project(PROJECT, EditorEntry::Default).unwrap();

        let report = workflow.batch_publish(&ids(&[5, 6, 7]), |_| {}).unwrap();
        assert_eq!(report.published_ids(), ids(&[5, 7]));

        let current = workflow.current().unwrap();
        assert!(current.is_placeholder());
        assert_eq!(current.chapter_number, 4);
    }

    assert_eq!(
        notes.warnings,
        vec!["成功发布 2 个章节，1 个章节发布失败".to_string()]
    );
    assert!(notes.successes.is_empty());
    assert!(confirm.prompts.is_empty());
}

#[test]
fn workflow_returns_report_when_reload_fails() {
    let api = FakeChapterApi::with_chapters(&[(5, 1, D), (6, 2, D), (7, 3, D)]);
    let mut confirm = ScriptedConfirm::default();
    let mut notes = RecordingNotifier::default();

    {
        let store = ChapterStore::new(&api, Session::new());
        let mut workflow = ChapterWorkflow::new(store, &mut confirm, &mut notes);
        workflow.open_project(PROJECT, EditorEntry::Default).unwrap();
        api.fail_list(server_error("获取章节列表失败"));

        let report = workflow.batch_publish(&ids(&[5, 6, 7]), |_| {}).unwrap();
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 0);

        let current = workflow.current().unwrap();
        assert!(current.is_placeholder());
        assert_eq!(current.chapter_number, 4);
    }

    assert_eq!(api.statuses(), vec![(1, P), (2, P), (3, P)]);
    assert_eq!(notes.successes, vec!["成功发布 3 个章节".to_string()]);
    assert_eq!(
        notes.warnings,
        vec!["章节列表刷新失败：获取章节列表失败".to_string()]
    );
    assert!(notes.errors.is_empty());
}

#[test]
fn workflow_success_summary_without_failures() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, D), (3, 3, D), (4, 4, D)]);
    let mut confirm = ScriptedConfirm::default();
    let mut notes = RecordingNotifier::default();

    {
        let store = ChapterStore::new(&api, Session::new());
        let mut workflow = ChapterWorkflow::new(store, &mut confirm, &mut notes);
        workflow
            .open_project(PROJECT, EditorEntry::Explicit(ChapterId(3)))
            .unwrap();

        let selected = select_through_current(workflow.store().chapters(), ChapterId(3));
        assert_eq!(selected, ids(&[2, 3]));
        workflow.batch_publish(&selected, |_| {}).unwrap();
        assert_eq!(workflow.current().unwrap().id, Some(ChapterId(4)));
    }

    assert_eq!(notes.successes, vec!["成功发布 2 个章节".to_string()]);
    assert_eq!(api.statuses(), vec![(1, P), (2, P), (3, P), (4, D)]);
}

#[test]
fn empty_selection_warns_and_sends_nothing() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, D)]);
    let mut confirm = ScriptedConfirm::default();
    let mut notes = RecordingNotifier::default();

    {
        let store = ChapterStore::new(&api, Session::new());
        let mut workflow = ChapterWorkflow::new(store, &mut confirm, &mut notes);
        workflow.open_project(PROJECT, EditorEntry::Default).unwrap();
        api.clear_calls();

        let report = workflow.batch_publish(&[], |_| {}).unwrap();
        assert_eq!(report.total_chapters, 0);
    }

    assert!(api.calls().is_empty());
    assert_eq!(notes.warnings, vec!["请至少选择一个要发布的章节".to_string()]);
}
