//! 사전 렌더링된 메시지 팬아웃.
//!
//! 구독자마다 용량이 제한된 메일박스(`mpsc`)를 가진다. `publish`는 현재 구독자
//! 집합을 스냅샷한 뒤 각 메일박스에 `try_send`로 넣는다. 메일박스가 가득 차면
//! 해당 구독자에게만 메시지를 버리고, 발행자는 절대 대기하지 않는다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, trace};

/// 구독자 식별자
pub type SubscriberId = u64;

/// 구독자당 기본 메일박스 용량
pub const DEFAULT_MAILBOX_CAPACITY: usize = 100;

/// 한 번의 발행 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// 메일박스에 들어간 수
    pub delivered: usize,
    /// 메일박스가 가득 차 버려진 수
    pub dropped: usize,
    /// 수신 측이 사라져 정리된 구독자 수
    pub closed: usize,
}

#[derive(Debug)]
struct Registry {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Registry {
    fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }
}

/// 메시지 브로드캐스터
///
/// 복제본은 같은 구독자 집합을 공유한다.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    /// 메일박스 용량 `capacity`로 생성 (0은 1로 취급)
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// 새 메일박스 등록
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.registry.capacity);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut subscribers = self.registry.subscribers.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        debug!("구독자 등록: id={id}, 총 {count}명");

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// 구독 해제. 이미 해제된 id면 false (멱등).
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            debug!("구독자 해제: id={id}");
        }
        removed
    }

    /// 현재 구독자 수
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().len()
    }

    /// 모든 구독자에게 비차단 전송
    pub fn publish(&self, message: impl Into<Arc<str>>) -> PublishReport {
        let message: Arc<str> = message.into();
        let snapshot: Vec<(SubscriberId, mpsc::Sender<Arc<str>>)> = self
            .registry
            .subscribers
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = PublishReport::default();
        let mut closed = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(Arc::clone(&message)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    debug!("메일박스 가득 참, 메시지 폐기: id={id}");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.registry.subscribers.lock();
            for id in &closed {
                subscribers.remove(id);
            }
            report.closed = closed.len();
            debug!("닫힌 메일박스 정리: {}개", closed.len());
        }

        trace!(
            "발행 완료: delivered={}, dropped={}, closed={}",
            report.delivered,
            report.dropped,
            report.closed
        );
        report
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

/// 구독 핸들
///
/// drop 시 자동으로 구독 해제된다.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<str>>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// 다음 메시지 대기. 구독이 해제되었으면 None.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// 대기 없이 메시지 확인
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!("구독 핸들 해제: id={}", self.id);
            }
        }
    }
}
