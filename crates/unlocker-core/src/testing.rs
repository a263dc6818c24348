//! Test doubles shared by the in-crate test modules.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use chrono::{TimeZone, Utc};
use ulid::Ulid;

use crate::app::{PersistenceAdapter, RetrySupervisor, RunContext};
use crate::domain::{
    EventSinkError, Link, ResolveOutcome, RunId, StreamEvent, TaskId, TaskRecord, UnlockError,
};
use crate::impls::InMemoryTaskStore;
use crate::ports::{Clock, EventSink, FixedClock, Resolver, SystemClock, UlidGenerator};
use crate::resolver::{Capability, ResolverChain, ResolverRegistry, StageTable};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok(ResolveOutcome),
    Fail(String),
    Raise(String),
    /// Never answers.
    Hang,
}

/// Scripted resolver. Replies are consumed in order; the last one repeats.
pub(crate) struct FakeResolver {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeResolver {
    pub(crate) fn script(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub(crate) fn succeed(url: &str) -> Self {
        Self::script(vec![Reply::Ok(ResolveOutcome::success(url))])
    }

    pub(crate) fn fail(msg: &str) -> Self {
        Self::script(vec![Reply::Fail(msg.to_string())])
    }

    pub(crate) fn raise(msg: &str) -> Self {
        Self::script(vec![Reply::Raise(msg.to_string())])
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or(Reply::Fail("no reply scripted".to_string()))
        }
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, url: &str) -> Result<ResolveOutcome, UnlockError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.next_reply();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Ok(outcome) => Ok(outcome),
            Reply::Fail(msg) => Ok(ResolveOutcome::failure(msg)),
            Reply::Raise(msg) => Err(UnlockError::Resolver(msg)),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// One fake per standard capability. Unconfigured ones fail every call.
pub(crate) struct FakeResolvers {
    pub(crate) fast_path: Arc<FakeResolver>,
    pub(crate) timer: Arc<FakeResolver>,
    pub(crate) native: Arc<FakeResolver>,
    pub(crate) link_page: Arc<FakeResolver>,
    pub(crate) drive: Arc<FakeResolver>,
    pub(crate) cloud: Arc<FakeResolver>,
}

impl Default for FakeResolvers {
    fn default() -> Self {
        let unexpected = || Arc::new(FakeResolver::fail("unexpected call"));
        Self {
            fast_path: unexpected(),
            timer: unexpected(),
            native: unexpected(),
            link_page: unexpected(),
            drive: unexpected(),
            cloud: unexpected(),
        }
    }
}

impl FakeResolvers {
    pub(crate) fn registry(&self) -> ResolverRegistry {
        let mut reg = ResolverRegistry::new();
        let entries: [(&str, &Arc<FakeResolver>); 6] = [
            (Capability::FAST_PATH, &self.fast_path),
            (Capability::TIMER_BYPASS, &self.timer),
            (Capability::NATIVE_BYPASS, &self.native),
            (Capability::LINK_PAGE, &self.link_page),
            (Capability::DRIVE, &self.drive),
            (Capability::CLOUD, &self.cloud),
        ];
        for (cap, fake) in entries {
            reg.register(cap, fake.clone()).unwrap();
        }
        reg
    }

    pub(crate) fn total_calls(&self) -> usize {
        [
            &self.fast_path,
            &self.timer,
            &self.native,
            &self.link_page,
            &self.drive,
            &self.cloud,
        ]
        .iter()
        .map(|f| f.call_count())
        .sum()
    }
}

/// Sink that keeps every event, or rejects all of them when closed.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<StreamEvent>>,
    closed: bool,
}

impl RecordingSink {
    pub(crate) fn closed() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            closed: true,
        }
    }

    pub(crate) fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: StreamEvent) -> Result<(), EventSinkError> {
        if self.closed {
            return Err(EventSinkError::Closed);
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

pub(crate) fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
}

pub(crate) fn persistence(store: &InMemoryTaskStore) -> Arc<PersistenceAdapter> {
    Arc::new(PersistenceAdapter::new(
        Arc::new(store.clone()),
        Arc::new(clock()),
    ))
}

pub(crate) fn supervisor(
    fakes: &FakeResolvers,
    store: &InMemoryTaskStore,
    link_timeout: Duration,
) -> RetrySupervisor {
    let chain = ResolverChain::new(StageTable::standard(), Arc::new(fakes.registry()));
    RetrySupervisor::new(
        Arc::new(chain),
        persistence(store),
        Arc::new(UlidGenerator::new(SystemClock)),
        link_timeout,
        2,
    )
}

pub(crate) fn ctx(task_id: Option<&str>) -> RunContext {
    RunContext::new(RunId::from(Ulid::nil()), task_id.map(TaskId::new), None)
}

/// Store holding one pending task whose links get their index as id.
pub(crate) async fn store_with_task(task_id: &str, urls: &[&str]) -> InMemoryTaskStore {
    let store = InMemoryTaskStore::new();
    let links = urls
        .iter()
        .enumerate()
        .map(|(i, url)| Link::new(*url).with_id(i as u64).with_name(format!("link {i}")))
        .collect();
    store
        .insert_task(TaskRecord::new(task_id, links, clock().now()))
        .await;
    store
}
