//! Grouped deletion across policies.

mod common;

use common::*;
use depot_core::constants::THUMB_SIDECAR_METADATA_KEY;
use depot_core::models::{File, Policy};
use depot_core::DeleteErrorMode;
use depot_db::FileStore;
use depot_fs::{FsOptions, OpContext};
use depot_infra::SessionStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn with_thumb(mut file: File) -> File {
    file.metadata
        .insert(THUMB_SIDECAR_METADATA_KEY.to_string(), "true".to_string());
    file
}

/// Two policies: A with a working handler that fails `f2`, B whose handler
/// cannot be built.
struct TwoPolicies {
    world: World,
    a: Policy,
    b: Policy,
    handler_a: Arc<RecordingHandler>,
    f1: File,
    f2: File,
    f3: File,
}

fn two_policies(handler_a: impl FnOnce(&File, &File) -> RecordingHandler) -> TwoPolicies {
    let owner = user(0);
    let (a, b) = (policy(true, false), policy(true, false));
    let store = MemoryFileStore::new();
    store.add_policy(a.clone());
    store.add_policy(b.clone());

    let home = folder(&owner, "/", None);
    let f1 = with_thumb(file(&owner, &home, &a, "one.jpg", 10));
    let f2 = file(&owner, &home, &a, "two.jpg", 10);
    let f3 = file(&owner, &home, &b, "three.jpg", 10);

    let handler_a = Arc::new(handler_a(&f1, &f2));
    let factory = StaticHandlerFactory::default().with(a.id, handler_a.clone());
    let world = World::new(owner, store, StaticSettings::default(), factory);

    TwoPolicies {
        world,
        a,
        b,
        handler_a,
        f1,
        f2,
        f3,
    }
}

fn objects(f1: &File, f2: &File) -> RecordingHandler {
    RecordingHandler::new()
        .with_object(&f1.source_name, vec![1])
        .with_object(&f1.thumb_file("._thumb"), vec![2])
        .with_object(&f2.source_name, vec![3])
}

#[tokio::test]
async fn partial_failure_and_dispatch_failure_are_reported_per_policy() {
    let t = two_policies(|f1, f2| objects(f1, f2).failing(&f2.source_name));

    let failed = t
        .world
        .fs()
        .delete_grouped(
            &OpContext::default(),
            vec![t.f1.clone(), t.f2.clone(), t.f3.clone()],
        )
        .await;

    assert_eq!(failed.len(), 2);
    assert_eq!(failed[&t.a.id], vec![t.f2.source_name.clone()]);
    assert_eq!(failed[&t.b.id], vec![t.f3.source_name.clone()]);

    assert!(!t.handler_a.has_object(&t.f1.source_name));
    assert!(!t.handler_a.has_object(&t.f1.thumb_file("._thumb")));
    assert!(t.handler_a.has_object(&t.f2.source_name));
}

#[tokio::test]
async fn thumbnail_failures_are_never_reported() {
    let t = two_policies(|f1, f2| objects(f1, f2).failing(&f1.thumb_file("._thumb")));

    let failed = t
        .world
        .fs()
        .delete_grouped(&OpContext::default(), vec![t.f1.clone(), t.f2.clone()])
        .await;

    assert_eq!(failed.len(), 1);
    assert!(failed[&t.a.id].is_empty());

    // Thumbnail was still requested
    let requested: HashSet<String> = match t.handler_a.calls().as_slice() {
        [Call::Delete(locators)] => locators.iter().cloned().collect(),
        other => panic!("unexpected calls {:?}", other),
    };
    assert!(requested.contains(&t.f1.thumb_file("._thumb")));
    assert!(!requested.contains(&t.f2.thumb_file("._thumb")));
}

#[tokio::test]
async fn reported_failures_are_always_submitted_primaries() {
    let t = two_policies(|f1, f2| {
        objects(f1, f2)
            .failing(&f1.source_name)
            .failing(&f1.thumb_file("._thumb"))
            .failing(&f2.source_name)
    });
    let files = vec![t.f1.clone(), t.f2.clone(), t.f3.clone()];
    let primaries: HashSet<String> = files.iter().map(|f| f.source_name.clone()).collect();

    let failed = t
        .world
        .fs()
        .delete_grouped(&OpContext::default(), files)
        .await;

    let reported: Vec<&String> = failed.values().flatten().collect();
    assert_eq!(reported.len(), 3);
    assert!(reported.iter().all(|l| primaries.contains(*l)));
}

#[tokio::test]
async fn batch_error_modes() {
    let trusting = two_policies(|f1, f2| objects(f1, f2).with_delete_error("node partitioned"));
    let failed = trusting
        .world
        .fs()
        .delete_grouped(
            &OpContext::default(),
            vec![trusting.f1.clone(), trusting.f2.clone()],
        )
        .await;
    assert!(failed[&trusting.a.id].is_empty());

    let strict = two_policies(|f1, f2| objects(f1, f2).with_delete_error("node partitioned"));
    let options = FsOptions {
        delete_error_mode: DeleteErrorMode::FailGroup,
        ..FsOptions::default()
    };
    let failed = strict
        .world
        .fs_with(options)
        .delete_grouped(
            &OpContext::default(),
            vec![strict.f1.clone(), strict.f2.clone()],
        )
        .await;
    assert_eq!(
        failed[&strict.a.id],
        vec![strict.f1.source_name.clone(), strict.f2.source_name.clone()]
    );
}

#[tokio::test]
async fn parallel_groups_report_the_same_map() {
    let t = two_policies(|f1, f2| objects(f1, f2).failing(&f2.source_name));
    let options = FsOptions {
        delete_concurrency: 4,
        ..FsOptions::default()
    };

    let failed = t
        .world
        .fs_with(options)
        .delete_grouped(
            &OpContext::default(),
            vec![t.f3.clone(), t.f1.clone(), t.f2.clone()],
        )
        .await;

    assert_eq!(failed[&t.a.id], vec![t.f2.source_name.clone()]);
    assert_eq!(failed[&t.b.id], vec![t.f3.source_name.clone()]);
}

#[tokio::test]
async fn zero_concurrency_still_deletes_every_group() {
    let t = two_policies(|f1, f2| objects(f1, f2).failing(&f2.source_name));
    let options = FsOptions {
        delete_concurrency: 0,
        ..FsOptions::default()
    };
    let fs = t.world.fs_with(options);

    let failed = tokio::time::timeout(
        Duration::from_secs(2),
        fs.delete_grouped(
            &OpContext::default(),
            vec![t.f1.clone(), t.f2.clone(), t.f3.clone()],
        ),
    )
    .await
    .expect("grouped deletion did not finish");

    assert_eq!(failed[&t.a.id], vec![t.f2.source_name.clone()]);
    assert_eq!(failed[&t.b.id], vec![t.f3.source_name.clone()]);
}

#[tokio::test]
async fn remove_files_keeps_records_whose_objects_remain() {
    let t = two_policies(|f1, f2| objects(f1, f2).failing(&f2.source_name));
    for f in [&t.f1, &t.f2, &t.f3] {
        t.world.store.add_file(f.clone());
    }
    let owner = t.world.user.id;
    t.world.store.increase_user_storage(owner, 30).await.unwrap();

    let removal = t
        .world
        .fs()
        .remove_files(
            &OpContext::default(),
            vec![t.f1.clone(), t.f2.clone(), t.f3.clone()],
        )
        .await
        .unwrap();

    assert_eq!(removal.removed, vec![t.f1.id]);
    assert_eq!(removal.failed[&t.a.id], vec![t.f2.source_name.clone()]);
    assert_eq!(removal.failed[&t.b.id], vec![t.f3.source_name.clone()]);

    assert!(!t.world.store.has_file(t.f1.id));
    assert!(t.world.store.has_file(t.f2.id));
    assert!(t.world.store.has_file(t.f3.id));
    assert_eq!(t.world.store.storage_of(owner), 20);
}

#[tokio::test]
async fn cancelled_removal_keeps_every_record() {
    let t = two_policies(objects);
    t.world.store.add_file(t.f1.clone());
    let ctx = OpContext::default();
    ctx.cancel.cancel();

    let removal = t
        .world
        .fs()
        .remove_files(&ctx, vec![t.f1.clone()])
        .await
        .unwrap();

    assert!(removal.removed.is_empty());
    assert!(t.world.store.has_file(t.f1.id));
}

#[tokio::test]
async fn upload_sessions_are_cancelled_and_evicted_even_when_cancel_fails() {
    let t = two_policies(|f1, f2| objects(f1, f2).failing_cancel());
    let session = upload_session("sess-1", &t.a);
    t.world.sessions.put(session.clone()).await;
    let uploading = File {
        upload_session_id: Some(session.key.clone()),
        ..t.f2.clone()
    };

    let failed = t
        .world
        .fs()
        .delete_grouped(&OpContext::default(), vec![uploading])
        .await;

    assert!(failed[&t.a.id].is_empty());
    let calls = t.handler_a.calls();
    assert_eq!(calls[0], Call::Cancel("sess-1".to_string()));
    assert!(matches!(calls[1], Call::Delete(_)));
    assert!(t.world.sessions.get("sess-1").await.is_none());
}

#[tokio::test]
async fn missing_session_is_skipped() {
    let t = two_policies(objects);
    let orphaned = File {
        upload_session_id: Some("gone".to_string()),
        ..t.f1.clone()
    };

    let failed = t
        .world
        .fs()
        .delete_grouped(&OpContext::default(), vec![orphaned])
        .await;

    assert!(failed[&t.a.id].is_empty());
    assert!(t
        .handler_a
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::Cancel(_))));
}

#[tokio::test]
async fn cancelled_deletion_fails_every_group_without_backend_calls() {
    let t = two_policies(objects);
    let ctx = OpContext::default();
    ctx.cancel.cancel();

    let failed = t
        .world
        .fs()
        .delete_grouped(&ctx, vec![t.f1.clone(), t.f2.clone(), t.f3.clone()])
        .await;

    assert_eq!(failed.len(), 2);
    assert_eq!(failed[&t.a.id].len(), 2);
    assert_eq!(failed[&t.b.id], vec![t.f3.source_name.clone()]);
    assert!(t.handler_a.calls().is_empty());
    assert!(t.handler_a.has_object(&t.f1.source_name));
}

#[tokio::test]
async fn empty_input_yields_empty_map() {
    let t = two_policies(objects);
    let failed = t
        .world
        .fs()
        .delete_grouped(&OpContext::default(), Vec::new())
        .await;
    assert!(failed.is_empty());
}
