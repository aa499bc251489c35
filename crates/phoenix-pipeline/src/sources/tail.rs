//! JSONL 로그 파일 추적기.
//!
//! 파일이 생길 때까지 기다린 뒤 끝(또는 처음)부터 줄 단위로 읽는다. EOF에서는
//! 주기적으로 다시 확인하고, 파일이 잘리거나 사라지면 다시 연다. 잘못된 줄은
//! 건너뛰고, I/O 에러는 잠시 쉰 뒤 재시도한다.

use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::hub::MetricsHub;
use crate::normalize::normalize_line;

/// 추적 설정
#[derive(Debug, Clone)]
pub struct TailOptions {
    pub path: PathBuf,
    /// 처음 열 때 파일 처음부터 읽기
    pub from_start: bool,
    /// EOF에서 재확인 간격
    pub poll_interval: Duration,
    /// 파일이 없을 때 대기 간격
    pub wait_interval: Duration,
    /// I/O 에러 후 재시도 간격
    pub retry_backoff: Duration,
}

impl TailOptions {
    pub fn new(path: impl Into<PathBuf>, from_start: bool) -> Self {
        Self {
            path: path.into(),
            from_start,
            poll_interval: Duration::from_millis(500),
            wait_interval: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// 열린 로그 파일에서 완성된 줄을 하나씩 읽는다.
///
/// 줄 끝(`\n`)이 아직 쓰이지 않은 부분은 다음 읽기까지 보관한다.
#[derive(Debug)]
pub struct LogFollower {
    path: PathBuf,
    reader: BufReader<File>,
    position: u64,
    pending: Vec<u8>,
}

impl LogFollower {
    /// 파일을 열고, `from_start`가 아니면 끝으로 이동
    pub async fn open(path: impl Into<PathBuf>, from_start: bool) -> std::io::Result<Self> {
        let path = path.into();
        let mut file = File::open(&path).await?;
        let position = if from_start {
            0
        } else {
            file.seek(SeekFrom::End(0)).await?
        };
        Ok(Self {
            path,
            reader: BufReader::new(file),
            position,
            pending: Vec::new(),
        })
    }

    /// 다음 완성된 줄. EOF면 None.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending).await?;
            self.position += read as u64;
            if self.pending.last() == Some(&b'\n') {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return Ok(Some(line));
            }
            if read == 0 {
                return Ok(None);
            }
        }
    }

    /// 파일이 잘렸거나 사라졌으면 true
    pub async fn was_replaced(&self) -> std::io::Result<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() < self.position),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        }
    }
}

/// 한 번 연 파일을 따라가다 끝난 이유
enum FollowEnd {
    Shutdown,
    /// 잘림 또는 교체
    Reopen,
}

/// 종료 신호까지 파일을 추적하며 이벤트를 허브에 넣는다.
pub async fn run_log_tailer(
    hub: MetricsHub,
    options: TailOptions,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        "로그 파일 추적 시작: {} (처음부터={})",
        options.path.display(),
        options.from_start
    );
    let mut from_start = options.from_start;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let follower = match LogFollower::open(&options.path, from_start).await {
            Ok(follower) => follower,
            Err(e) => {
                let wait = if e.kind() == ErrorKind::NotFound {
                    debug!("로그 파일 대기 중: {}", options.path.display());
                    options.wait_interval
                } else {
                    warn!("로그 파일 열기 실패: {}: {e}", options.path.display());
                    options.retry_backoff
                };
                if sleep_or_shutdown(wait, &mut shutdown_rx).await {
                    break;
                }
                continue;
            }
        };

        match follow(&hub, follower, &options, &mut shutdown_rx).await {
            Ok(FollowEnd::Shutdown) => break,
            Ok(FollowEnd::Reopen) => {
                info!("로그 파일 교체/잘림 감지, 다시 엶: {}", options.path.display());
                // 새 파일 내용은 모두 새 데이터
                from_start = true;
            }
            Err(e) => {
                warn!("로그 파일 읽기 실패: {e}");
                if sleep_or_shutdown(options.retry_backoff, &mut shutdown_rx).await {
                    break;
                }
            }
        }
    }
    info!("로그 파일 추적 종료");
}

async fn follow(
    hub: &MetricsHub,
    mut follower: LogFollower,
    options: &TailOptions,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> std::io::Result<FollowEnd> {
    loop {
        if *shutdown_rx.borrow() {
            return Ok(FollowEnd::Shutdown);
        }

        if let Some(line) = follower.next_line().await? {
            ingest_line(hub, &line);
            continue;
        }

        // EOF
        if sleep_or_shutdown(options.poll_interval, shutdown_rx).await {
            return Ok(FollowEnd::Shutdown);
        }
        if follower.was_replaced().await? {
            return Ok(FollowEnd::Reopen);
        }
    }
}

fn ingest_line(hub: &MetricsHub, line: &str) {
    match normalize_line(line) {
        Ok(Some(event)) => hub.ingest_one(event),
        Ok(None) => {}
        Err(e) => debug!("로그 줄 건너뜀: {e}"),
    }
}

/// 대기 중 종료 신호가 오면 true
async fn sleep_or_shutdown(wait: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(wait) => *shutdown_rx.borrow(),
        _ = shutdown_rx.changed() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::tests::test_hub;
    use std::io::Write;
    use tempfile::TempDir;

    fn fast_options(path: PathBuf, from_start: bool) -> TailOptions {
        TailOptions {
            path,
            from_start,
            poll_interval: Duration::from_millis(10),
            wait_interval: Duration::from_millis(10),
            retry_backoff: Duration::from_millis(10),
        }
    }

    async fn wait_for(hub: &MetricsHub, count: usize) -> bool {
        for _ in 0..300 {
            if hub.buffer().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn append(path: &std::path::Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn reads_existing_and_appended_lines_from_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bot.jsonl");
        append(&path, "{\"bot\":\"a\",\"latency_ms\":10}\nnot json\n");

        let hub = test_hub(100);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_log_tailer(
            hub.clone(),
            fast_options(path.clone(), true),
            rx,
        ));

        assert!(wait_for(&hub, 1).await);
        append(&path, "{\"bot\":\"b\",\"latency_ms\":20}\n");
        assert!(wait_for(&hub, 2).await);
        assert_eq!(hub.buffer().recent(1)[0].source_name, "b");

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn waits_for_missing_file_and_skips_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("later.jsonl");

        let hub = test_hub(100);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_log_tailer(
            hub.clone(),
            fast_options(path.clone(), false),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "{\"bot\":\"old\",\"latency_ms\":1}\n");
        // 파일을 열고 끝으로 이동할 시간
        tokio::time::sleep(Duration::from_millis(100)).await;
        append(&path, "{\"bot\":\"new\",\"latency_ms\":2}\n");

        assert!(wait_for(&hub, 1).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let names: Vec<String> = hub
            .buffer()
            .recent(10)
            .into_iter()
            .map(|e| e.source_name)
            .collect();
        assert!(names.contains(&"new".to_string()));

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn reopens_after_truncation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rotate.jsonl");
        append(
            &path,
            "{\"bot\":\"a\",\"latency_ms\":1}\n{\"bot\":\"a\",\"latency_ms\":2}\n",
        );

        let hub = test_hub(100);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_log_tailer(
            hub.clone(),
            fast_options(path.clone(), true),
            rx,
        ));
        assert!(wait_for(&hub, 2).await);

        std::fs::write(&path, "{\"bot\":\"z\",\"latency_ms\":3}\n").unwrap();
        assert!(wait_for(&hub, 3).await);
        assert_eq!(hub.buffer().recent(1)[0].source_name, "z");

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn partial_line_waits_for_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.jsonl");
        append(&path, "{\"bot\":\"p\",");

        let hub = test_hub(100);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_log_tailer(
            hub.clone(),
            fast_options(path.clone(), true),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hub.buffer().len(), 0);
        append(&path, "\"latency_ms\":7}\n");
        assert!(wait_for(&hub, 1).await);
        assert_eq!(hub.buffer().recent(1)[0].latency_ms, 7);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn follower_reads_only_new_complete_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("follow.jsonl");
        append(&path, "old line\n");

        let mut follower = LogFollower::open(&path, false).await.unwrap();
        assert_eq!(follower.next_line().await.unwrap(), None);

        append(&path, "first\nsec");
        assert_eq!(follower.next_line().await.unwrap().as_deref(), Some("first\n"));
        assert_eq!(follower.next_line().await.unwrap(), None);
        append(&path, "ond\n");
        assert_eq!(follower.next_line().await.unwrap().as_deref(), Some("second\n"));
        assert!(!follower.was_replaced().await.unwrap());

        std::fs::write(&path, "").unwrap();
        assert!(follower.was_replaced().await.unwrap());
    }
}
