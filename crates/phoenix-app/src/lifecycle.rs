//! 라이프사이클 관리.
//!
//! 종료 신호 전파, 시그널 핸들링, 백그라운드 태스크 정리.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 태스크 종료 대기 한도
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
            tasks: Vec::new(),
        }
    }

    /// 종료 수신기 복제
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 태스크 안에서 종료를 요청할 때 쓰는 송신기
    pub fn shutdown_sender(&self) -> Arc<watch::Sender<bool>> {
        self.shutdown_tx.clone()
    }

    /// 종료 시 기다릴 백그라운드 태스크 등록
    pub fn track(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.push((name, handle));
    }

    /// 종료 신호 발송
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        let _ = self.shutdown_tx.send(true);
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM)
    ///
    /// 시그널 핸들러 등록에 실패하면 Ctrl+C만 기다린다.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => info!("SIGINT 수신"),
                        _ = sigterm.recv() => info!("SIGTERM 수신"),
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("시그널 핸들러 등록 실패, Ctrl+C 대기: {e}");
                    wait_ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        wait_ctrl_c().await;

        self.shutdown();
    }

    /// 종료 신호 후 등록된 태스크를 기다린다.
    ///
    /// 한도 안에 끝나지 않은 태스크는 취소하며, 취소는 정상 종료로 본다.
    pub async fn join_all(self) {
        self.shutdown();
        for (name, mut handle) in self.tasks {
            match tokio::time::timeout(JOIN_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => debug!("태스크 종료: {name}"),
                Ok(Err(e)) if e.is_cancelled() => debug!("태스크 취소됨: {name}"),
                Ok(Err(e)) => warn!("태스크 비정상 종료: {name}: {e}"),
                Err(_) => {
                    info!("태스크 종료 대기 초과, 취소: {name}");
                    handle.abort();
                    let _ = handle.await;
                }
            }
        }
    }
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C 수신"),
        Err(e) => warn!("Ctrl+C 핸들러 등록 실패: {e}"),
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
