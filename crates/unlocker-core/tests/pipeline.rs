//! End-to-end pipeline scenarios against the in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use unlocker_core::app::{App, AppBuilder, PersistenceAdapter, SolveTaskRequest};
use unlocker_core::config::Settings;
use unlocker_core::domain::{
    Link, LinkId, LinkInput, LinkOutcome, LinkStatus, ResolveOutcome, TaskId, TaskRecord,
    TaskStatus, UnlockError,
};
use unlocker_core::impls::InMemoryTaskStore;
use unlocker_core::ports::{FixedClock, Resolver, TaskStore};
use unlocker_core::resolver::{Capability, StageTable};

/// Answers every call the same way after an optional delay.
struct StubResolver {
    answer: Result<String, String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl StubResolver {
    fn ok(url: &str) -> Arc<Self> {
        Self::new(Ok(url.to_string()), Duration::ZERO)
    }

    fn failing(msg: &str) -> Arc<Self> {
        Self::new(Err(msg.to_string()), Duration::ZERO)
    }

    fn new(answer: Result<String, String>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer,
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Resolver for StubResolver {
    async fn resolve(&self, url: &str) -> Result<ResolveOutcome, UnlockError> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(match &self.answer {
            Ok(next) => ResolveOutcome::success(next.clone()),
            Err(msg) => ResolveOutcome::failure(msg.clone()),
        })
    }
}

struct Harness {
    store: InMemoryTaskStore,
    resolvers: HashMap<String, Arc<StubResolver>>,
}

impl Harness {
    async fn new(task_id: &str, urls: &[&str]) -> Self {
        let store = InMemoryTaskStore::new();
        let links = urls
            .iter()
            .enumerate()
            .map(|(i, u)| Link::new(*u).with_id(i as u64).with_name(format!("link {i}")))
            .collect();
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        store
            .insert_task(TaskRecord::new(task_id, links, created))
            .await;

        let resolvers = StageTable::standard()
            .capabilities()
            .into_iter()
            .map(|c| (c.to_string(), StubResolver::failing("unexpected call")))
            .collect();
        Self { store, resolvers }
    }

    fn stub(mut self, capability: &str, resolver: Arc<StubResolver>) -> Self {
        self.resolvers.insert(capability.to_string(), resolver);
        self
    }

    fn resolver(&self, capability: &str) -> &Arc<StubResolver> {
        &self.resolvers[capability]
    }

    fn total_calls(&self) -> usize {
        self.resolvers.values().map(|r| r.calls()).sum()
    }

    fn app(&self, settings: Settings) -> App {
        let mut builder = AppBuilder::new(settings).with_store(Arc::new(self.store.clone()));
        for (cap, resolver) in &self.resolvers {
            builder = builder
                .register(Capability::new(cap.as_str()), resolver.clone())
                .unwrap();
        }
        builder.build().unwrap()
    }

    async fn task(&self, id: &str) -> TaskRecord {
        self.store.get_task(&TaskId::new(id)).await.unwrap()
    }

    async fn counted_results(&self, id: &str) -> usize {
        self.store
            .list_results(&TaskId::new(id))
            .await
            .unwrap()
            .iter()
            .filter(|r| r.status != LinkStatus::Deferred)
            .count()
    }
}

fn settings(budget_secs: u64, link_timeout_secs: u64) -> Settings {
    let mut s = Settings::default();
    s.pipeline.time_budget_secs = budget_secs;
    s.pipeline.link_timeout_secs = link_timeout_secs;
    s
}

#[tokio::test]
async fn mixed_run_completes_on_a_single_success() {
    let h = Harness::new(
        "t",
        &[
            "https://hubcloud.foo/a",
            "https://hubcloud.foo/b",
            "https://gdflix.dad/c",
            "https://ngwin.com/d",
        ],
    )
    .await
    .stub(Capability::CLOUD, StubResolver::ok("https://cdn/file"))
    .stub(Capability::TIMER_BYPASS, StubResolver::failing("timer down"));

    let summary = h
        .app(Settings::default())
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.done, 3);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.direct_count, 3);
    assert_eq!(summary.timer_count, 1);
    // the timer link failed on both attempts
    assert_eq!(h.resolver(Capability::TIMER_BYPASS).calls(), 2);

    let task = h.task("t").await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.completed_links_count, 4);
    assert_eq!(h.counted_results("t").await, 4);
    assert!(task.completed_at.is_some());
}

#[tokio::test]
async fn all_failures_mark_the_task_failed() {
    let h = Harness::new("t", &["https://hubcloud.foo/a", "https://example.com/b"])
        .await
        .stub(Capability::CLOUD, StubResolver::failing("no buttons"));

    h.app(Settings::default())
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    let task = h.task("t").await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.completed_links_count, 2);
}

#[tokio::test]
async fn unmatched_link_errors_without_calling_anything() {
    let h = Harness::new("t", &["https://example.com/file"]).await;

    h.app(Settings::default())
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    assert_eq!(h.total_calls(), 0);
    let record = h
        .store
        .result(&TaskId::new("t"), &LinkId::Index(0))
        .await
        .unwrap();
    assert_eq!(record.status, LinkStatus::Error);
    assert_eq!(record.error.as_deref(), Some("No solver matched for this URL"));
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_defers_and_a_later_run_resumes() {
    let urls = [
        "https://ngwin.com/0",
        "https://ngwin.com/1",
        "https://ngwin.com/2",
        "https://ngwin.com/3",
        "https://ngwin.com/4",
    ];
    let h = Harness::new("t", &urls).await.stub(
        Capability::TIMER_BYPASS,
        StubResolver::new(Ok("https://gdflix.dad/f".to_string()), Duration::from_secs(20)),
    );

    let first = h
        .app(settings(30, 25))
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    assert_eq!(first.done, 2);
    assert_eq!(first.deferred, 3);
    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 2);
    assert_eq!(task.status, TaskStatus::Processing);
    for lid in 2..5 {
        let rec = h
            .store
            .result(&TaskId::new("t"), &LinkId::Index(lid))
            .await
            .unwrap();
        assert_eq!(rec.status, LinkStatus::Deferred);
    }

    // next trigger picks up exactly the deferred links
    let second = h
        .app(settings(120, 25))
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    assert_eq!(second.processed, 3);
    assert_eq!(second.done, 3);
    assert_eq!(h.resolver(Capability::TIMER_BYPASS).calls(), 5);
    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 5);
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(h.counted_results("t").await, 5);
}

#[tokio::test(start_paused = true)]
async fn explicit_rerun_never_defers_a_settled_link() {
    let h = Harness::new("t", &["https://ngwin.com/0", "https://ngwin.com/1"])
        .await
        .stub(
            Capability::TIMER_BYPASS,
            StubResolver::new(Ok("https://gdflix.dad/f".to_string()), Duration::from_secs(20)),
        );
    let app = h.app(settings(10, 25));

    app.solve_task(SolveTaskRequest::new("t")).await.unwrap();
    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 1);
    assert_eq!(task.status, TaskStatus::Processing);

    // caller passes both links back, settled one last so the budget runs out on it
    let explicit = vec![
        LinkInput::new(1, "link 1", "https://ngwin.com/1"),
        LinkInput::new(0, "link 0", "https://ngwin.com/0"),
    ];
    let second = app
        .solve_task(SolveTaskRequest::new("t").with_links(explicit))
        .await
        .unwrap();
    assert_eq!(second.processed, 1);
    assert_eq!(second.deferred, 0);

    let third = app.solve_task(SolveTaskRequest::new("t")).await.unwrap();
    assert_eq!(third.processed, 0);

    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 2);
    assert_eq!(h.counted_results("t").await, 2);
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(h.resolver(Capability::TIMER_BYPASS).calls(), 2);
    let first = h
        .store
        .result(&TaskId::new("t"), &LinkId::Index(0))
        .await
        .unwrap();
    assert_eq!(first.status, LinkStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn late_deferral_keeps_the_settled_record() {
    let h = Harness::new("t", &["https://ngwin.com/0", "https://ngwin.com/1"])
        .await
        .stub(
            Capability::TIMER_BYPASS,
            StubResolver::new(Ok("https://gdflix.dad/f".to_string()), Duration::from_secs(20)),
        );
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap());
    let adapter = PersistenceAdapter::new(Arc::new(h.store.clone()), Arc::new(clock));
    let id = TaskId::new("t");
    let link = LinkInput::new(0, "link 0", "https://ngwin.com/0");

    adapter
        .write_result(&id, &link, &LinkOutcome::done("https://gdflix.dad/f"), "run-1")
        .await
        .unwrap();
    adapter
        .write_result(&id, &link, &LinkOutcome::deferred(vec![]), "run-2")
        .await
        .unwrap();

    // resume: only link 1 is still open
    let resumed = h
        .app(settings(120, 25))
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    assert_eq!(resumed.processed, 1);
    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 2);
    assert_eq!(h.counted_results("t").await, 2);
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
async fn already_final_link_never_enters_the_bypass_loop() {
    let h = Harness::new("t", &["https://hubdrive.wales/x"])
        .await
        .stub(Capability::DRIVE, StubResolver::ok("https://gdflix.dad/y"));

    h.app(Settings::default())
        .solve_task(SolveTaskRequest::new("t"))
        .await
        .unwrap();

    assert_eq!(h.resolver(Capability::TIMER_BYPASS).calls(), 0);
    assert_eq!(h.resolver(Capability::NATIVE_BYPASS).calls(), 0);
    assert_eq!(h.task("t").await.status, TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_writes_count_once() {
    let h = Harness::new("t", &["https://hubcloud.foo/a", "https://hubcloud.foo/b"]).await;
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap());
    let adapter = Arc::new(PersistenceAdapter::new(
        Arc::new(h.store.clone()),
        Arc::new(clock),
    ));
    let id = TaskId::new("t");
    let link = LinkInput::new(0, "a", "https://hubcloud.foo/a");

    let writes: Vec<_> = (0..16)
        .map(|_| {
            let adapter = adapter.clone();
            let id = id.clone();
            let link = link.clone();
            tokio::spawn(async move {
                adapter
                    .write_result(&id, &link, &LinkOutcome::done("https://cdn/a"), "race")
                    .await
                    .unwrap()
            })
        })
        .collect();
    for w in writes {
        w.await.unwrap();
    }

    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 1);
    assert_eq!(task.status, TaskStatus::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_finalizers_agree_on_status_and_timestamp() {
    let urls: Vec<String> = (0..32).map(|i| format!("https://hubcloud.foo/{i}")).collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let h = Harness::new("t", &url_refs).await;
    let id = TaskId::new("t");

    let writes: Vec<_> = (0..32u64)
        .map(|i| {
            // distinct clocks so each record carries its own solvedAt
            let at = Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, i as u32).unwrap();
            let adapter =
                PersistenceAdapter::new(Arc::new(h.store.clone()), Arc::new(FixedClock::new(at)));
            let id = id.clone();
            let link = LinkInput::new(i, format!("l{i}"), urls[i as usize].clone());
            tokio::spawn(async move {
                let outcome = if i % 2 == 0 {
                    LinkOutcome::done("https://cdn/x")
                } else {
                    LinkOutcome::error("nope")
                };
                adapter.write_result(&id, &link, &outcome, "race").await.unwrap()
            })
        })
        .collect();

    let mut finalized = Vec::new();
    for w in writes {
        if let Some(status) = w.await.unwrap() {
            finalized.push(status);
        }
    }

    assert!(!finalized.is_empty());
    assert!(finalized.iter().all(|s| *s == TaskStatus::Completed));
    let task = h.task("t").await;
    assert_eq!(task.completed_links_count, 32);
    assert_eq!(task.status, TaskStatus::Completed);
    // latest solvedAt, whichever finalizer wrote last
    assert_eq!(
        task.completed_at,
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 31).unwrap())
    );
}
