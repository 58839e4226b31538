mod common;

use common::{server_error, Call, FakeChapterApi, RecordingNotifier, ScriptedConfirm, D, P, PROJECT};
use inkwell_core::lifecycle::engine::plan_unlock;
use inkwell_core::model::chapter::BatchStatusRequest;
use inkwell_core::service::unlock::execute_unlock;
use inkwell_core::{
    ChapterId, ChapterStatus, ChapterStore, ChapterWorkflow, EditorEntry, Session, StoreError,
    UnlockMode, WorkflowError,
};

type TestWorkflow<'a> =
    ChapterWorkflow<&'a FakeChapterApi, &'a mut ScriptedConfirm, &'a mut RecordingNotifier>;

fn open<'a>(
    api: &'a FakeChapterApi,
    confirm: &'a mut ScriptedConfirm,
    notes: &'a mut RecordingNotifier,
) -> TestWorkflow<'a> {
    let store = ChapterStore::new(api, Session::with_token("t"));
    let mut workflow = ChapterWorkflow::new(store, confirm, notes);
    workflow.open_project(PROJECT, EditorEntry::Default).unwrap();
    api.clear_calls();
    workflow
}

#[test]
fn unlock_reverts_chapter_and_every_later_one() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, P), (3, 3, P)]);
    let mut confirm = ScriptedConfirm::answering(&[true]);
    let mut notes = RecordingNotifier::default();

    {
        let mut workflow = open(&api, &mut confirm, &mut notes);
        let outcome = workflow.unlock(2).unwrap();
        assert_eq!(outcome.reverted, vec![ChapterId(3), ChapterId(2)]);

        let cached: Vec<ChapterStatus> =
            workflow.store().chapters().iter().map(|c| c.status).collect();
        assert_eq!(cached, vec![P, D, D]);
        assert_eq!(workflow.current().unwrap().id, Some(ChapterId(2)));
    }

    assert_eq!(api.statuses(), vec![(1, P), (2, D), (3, D)]);
    assert_eq!(api.updated_ids(), vec![ChapterId(3), ChapterId(2)]);
    assert_eq!(confirm.prompts.len(), 1);
    assert!(confirm.prompts[0].message.contains("第2章"));
    assert_eq!(notes.successes.len(), 1);
    assert!(notes.errors.is_empty());
}

#[test]
fn unlocking_twice_equals_unlocking_once() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, P), (3, 3, P)]);
    let mut confirm = ScriptedConfirm::answering(&[true, true]);
    let mut notes = RecordingNotifier::default();

    let after_first;
    {
        let mut workflow = open(&api, &mut confirm, &mut notes);
        workflow.unlock(2).unwrap();
        after_first = api.statuses();
        api.clear_calls();

        let second = workflow.unlock(2).unwrap();
        assert!(second.reverted.is_empty());
    }

    assert_eq!(api.statuses(), after_first);
    assert!(api.calls().is_empty());
    assert_eq!(confirm.prompts.len(), 1);
}

#[test]
fn chapters_before_unlock_point_are_untouched() {
    let seed = [(1, 1, P), (2, 2, P), (3, 3, D), (4, 4, P), (5, 5, P)];
    for number in 1..=6 {
        let api = FakeChapterApi::with_chapters(&seed);
        let mut confirm = ScriptedConfirm::answering(&[true]);
        let mut notes = RecordingNotifier::default();
        {
            let mut workflow = open(&api, &mut confirm, &mut notes);
            workflow.unlock(number).unwrap();
        }

        for ((chapter_number, status), (_, original_number, original)) in
            api.statuses().into_iter().zip(seed)
        {
            assert_eq!(chapter_number, original_number);
            if chapter_number < number {
                assert_eq!(status, original, "unlock {number} touched {chapter_number}");
            } else {
                assert_eq!(status, D, "unlock {number} left {chapter_number} published");
            }
        }
    }
}

#[test]
fn unlocking_draft_still_reverts_published_successors() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, D), (3, 3, P)]);
    let mut confirm = ScriptedConfirm::answering(&[true]);
    let mut notes = RecordingNotifier::default();

    {
        let mut workflow = open(&api, &mut confirm, &mut notes);
        let outcome = workflow.unlock(2).unwrap();
        assert_eq!(outcome.reverted, vec![ChapterId(3)]);
    }

    assert_eq!(api.statuses(), vec![(1, P), (2, D), (3, D)]);
}

#[test]
fn declined_confirmation_changes_nothing() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, P)]);
    let mut confirm = ScriptedConfirm::answering(&[false]);
    let mut notes = RecordingNotifier::default();

    {
        let mut workflow = open(&api, &mut confirm, &mut notes);
        let err = workflow.unlock(1).unwrap_err();
        assert_eq!(err, WorkflowError::Cancelled);
        assert!(workflow.store().chapters().iter().all(|c| c.is_published()));
    }

    assert!(api.calls().is_empty());
    assert_eq!(api.statuses(), vec![(1, P), (2, P)]);
    assert!(notes.errors.is_empty());
    assert!(notes.successes.is_empty());
}

#[test]
fn per_chapter_unlock_stops_at_first_failure() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, P), (3, 3, P)]);
    api.fail_update(2, server_error("取消发布章节失败"));
    let mut confirm = ScriptedConfirm::answering(&[true]);
    let mut notes = RecordingNotifier::default();

    {
        let mut workflow = open(&api, &mut confirm, &mut notes);
        let err = workflow.unlock(1).unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));

        // Cache is resynced with what the server actually holds.
        let cached: Vec<ChapterStatus> =
            workflow.store().chapters().iter().map(|c| c.status).collect();
        assert_eq!(cached, vec![P, P, D]);
    }

    assert_eq!(api.updated_ids(), vec![ChapterId(3), ChapterId(2)]);
    assert_eq!(api.statuses(), vec![(1, P), (2, P), (3, D)]);
    assert_eq!(notes.errors, vec!["取消发布章节失败".to_string()]);
}

#[test]
fn batch_endpoint_mode_without_project_reports_not_loaded() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P)]);
    let mut store = ChapterStore::new(&api, Session::new());
    let plan = plan_unlock(&[common::chapter(1, 1, P)], 1);

    let err = execute_unlock(&mut store, &plan, UnlockMode::BatchEndpoint).unwrap_err();

    assert_eq!(err, StoreError::NotLoaded);
    assert_eq!(err.to_string(), "尚未加载项目章节");
    assert!(api.calls().is_empty());
}

#[test]
fn batch_endpoint_mode_sends_one_request() {
    let api = FakeChapterApi::with_chapters(&[(1, 1, P), (2, 2, P), (3, 3, P)]);
    let mut confirm = ScriptedConfirm::answering(&[true]);
    let mut notes = RecordingNotifier::default();

    {
        let mut workflow =
            open(&api, &mut confirm, &mut notes).with_unlock_mode(UnlockMode::BatchEndpoint);
        let outcome = workflow.unlock(2).unwrap();
        assert_eq!(outcome.reverted, vec![ChapterId(2), ChapterId(3)]);
    }

    let batch_calls: Vec<Call> = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::BatchStatus(_) | Call::Update(..)))
        .collect();
    assert_eq!(
        batch_calls,
        vec![Call::BatchStatus(BatchStatusRequest {
            project_id: PROJECT,
            from_chapter_number: 2,
            new_status: ChapterStatus::Draft,
        })]
    );
    assert_eq!(api.statuses(), vec![(1, P), (2, D), (3, D)]);
}

#[test]
fn plan_lists_affected_and_reverted_chapters() {
    let chapters: Vec<_> = [(1, 1, P), (2, 2, D), (3, 3, P), (4, 4, D)]
        .iter()
        .map(|(id, number, status)| common::chapter(*id, *number, *status))
        .collect();

    let plan = plan_unlock(&chapters, 2);

    assert_eq!(plan.from_chapter_number, 2);
    assert_eq!(plan.affected, vec![ChapterId(2), ChapterId(3), ChapterId(4)]);
    assert_eq!(plan.reverts, vec![ChapterId(3)]);
    assert!(!plan.is_noop());
    assert!(plan_unlock(&chapters, 4).is_noop());
}
