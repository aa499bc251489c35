//! 메트릭 이벤트 링 버퍼와 집계.
//!
//! 최근 `max_events`개의 이벤트를 삽입 순서대로 보관하고, 대시보드가 쓰는
//! KPI/시계열/히트맵/일일 요약을 계산한다. 용량을 넘으면 가장 오래된 이벤트부터
//! 제거된다. 모든 집계는 빈 버퍼에서 0 값을 반환하며 실패하지 않는다.
//!
//! 시각 의존 집계는 `*_at(now)` 변형을 제공하여 테스트에서 시계를 주입할 수 있다.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use phoenix_core::models::metric::{bot_id_of, EventStatus, MetricEvent};

/// `recent()` 기본 개수
pub const DEFAULT_RECENT: usize = 25;
/// 지연/손익 시계열 기본 길이
pub const DEFAULT_SERIES_LEN: usize = 50;
/// 처리량 시계열 기본 분 버킷 수
pub const DEFAULT_THROUGHPUT_MINUTES: usize = 30;
/// 히트맵 기본 열 수
pub const DEFAULT_HEATMAP_COLS: usize = 12;
/// 라이브 시계열 기본 길이
pub const DEFAULT_LIVE_LEN: usize = 60;

/// KPI 윈도우 (성공률, 처리량)
const KPI_WINDOW_SECS: i64 = 60;
/// 히트맵 한 칸의 폭
const HEATMAP_WINDOW_SECS: i64 = 5;
/// 히트맵 지연 버킷 라벨 (행)
const HEATMAP_ROWS: [&str; 4] = ["0-100ms", "100-200ms", "200-300ms", "300ms+"];
/// 일일 요약 상위 봇 수
const TOP_BOTS: usize = 5;

// ============================================================
// 집계 결과 타입
// ============================================================

/// KPI 요약
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// 버퍼 전체 평균 지연 (소수점 버림)
    pub avg_latency_ms: u64,
    /// 최근 60초 에러 없는 이벤트 비율 (%)
    pub success_rate_pct: f64,
    /// 최근 60초 이벤트 수
    pub throughput_1m: usize,
    /// profit이 있는 이벤트의 평균 손익
    pub avg_profit: f64,
}

/// 라벨/값 병렬 시계열
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series<T> {
    pub labels: Vec<String>,
    pub values: Vec<T>,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T> Series<T> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, label: String, value: T) {
        self.labels.push(label);
        self.values.push(value);
    }
}

/// 지연 버킷 × 5초 윈도우 히트맵
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    /// 지연 버킷 라벨
    pub rows: Vec<String>,
    /// 윈도우 시작 시각 라벨 (오래된 것부터)
    pub cols: Vec<String>,
    /// `cells[row][col]` 이벤트 수
    pub cells: Vec<Vec<u32>>,
}

impl Heatmap {
    /// 가장 큰 칸 값 (색상 정규화용)
    pub fn max_cell(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// 상태별 이벤트 수
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
}

impl StatusCounts {
    fn record(&mut self, status: EventStatus) {
        match status {
            EventStatus::Ok => self.ok += 1,
            EventStatus::Warning => self.warning += 1,
            EventStatus::Critical => self.critical += 1,
        }
    }
}

/// 봇별 손익 합계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotProfit {
    pub bot_name: String,
    pub profit: f64,
}

/// 일일 요약 (UTC 날짜 기준)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_events: usize,
    pub avg_latency_ms: f64,
    /// 에러 없음 + 상태 ok/미지정 비율 (%)
    pub success_rate_pct: f64,
    pub total_profit: f64,
    pub status_counts: StatusCounts,
    /// 손익 합계 상위 5개 봇 (내림차순)
    pub top_bots: Vec<BotProfit>,
}

/// 봇별 상태
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotHealth {
    pub bot_name: String,
    pub last_heartbeat: DateTime<Utc>,
    pub success_ratio: f64,
    pub failure_count: usize,
    pub avg_latency_ms: f64,
    pub total_count: usize,
}

/// 라이브 차트 지표
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveMetric {
    Latency,
    Throughput,
    Profit,
    SuccessRate,
}

impl LiveMetric {
    /// 경로 파라미터 해석. 알 수 없는 값은 지연으로 처리한다.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "throughput" => Self::Throughput,
            "profit" => Self::Profit,
            "success_rate" => Self::SuccessRate,
            _ => Self::Latency,
        }
    }

    fn value_of(&self, event: &MetricEvent) -> f64 {
        match self {
            Self::Latency => event.latency_ms as f64,
            Self::Throughput => 1.0,
            Self::Profit => event.profit.unwrap_or(0.0),
            Self::SuccessRate => {
                if event.is_error_free() {
                    100.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// 라이브 차트 데이터 (최신 이벤트부터)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveSeries {
    /// epoch 밀리초
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

/// 렌더링 입력이 되는 대시보드 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub kpis: Kpis,
    pub latency_series: Series<u64>,
    pub throughput_series: Series<usize>,
    pub profit_series: Series<f64>,
    pub heatmap: Heatmap,
    pub last_events: Vec<MetricEvent>,
}

// ============================================================
// EventBuffer
// ============================================================

/// 용량 제한 이벤트 버퍼
///
/// 내부 잠금으로 동기화되므로 `Arc<EventBuffer>`로 공유한다.
#[derive(Debug)]
pub struct EventBuffer {
    events: RwLock<VecDeque<MetricEvent>>,
    /// 지금까지 추가된 이벤트 수 (쓰기 잠금 안에서만 증가)
    added: AtomicU64,
    max_events: usize,
}

impl EventBuffer {
    /// 최대 `max_events`개를 보관하는 버퍼 생성 (0은 1로 취급)
    pub fn new(max_events: usize) -> Self {
        let max_events = max_events.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(max_events.min(4096))),
            added: AtomicU64::new(0),
            max_events,
        }
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// 이벤트 추가. 용량 초과 시 가장 오래된 이벤트 제거.
    pub fn add(&self, event: MetricEvent) {
        let mut events = self.events.write();
        events.push_back(event);
        self.added.fetch_add(1, Ordering::Release);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// 커서 이후에 추가된 이벤트 (오래된 것부터)와 다음 커서
    ///
    /// 커서는 지금까지 추가된 이벤트 수다. 그 사이 제거된 이벤트는 건너뛴다.
    pub fn events_since(&self, cursor: u64) -> (Vec<MetricEvent>, u64) {
        let events = self.events.read();
        let added = self.added.load(Ordering::Acquire);
        let oldest = added - events.len() as u64;
        let skip = cursor.saturating_sub(oldest).min(events.len() as u64) as usize;
        (events.iter().skip(skip).cloned().collect(), added)
    }

    /// 최근 `n`개 (최신 순)
    pub fn recent(&self, n: usize) -> Vec<MetricEvent> {
        self.events.read().iter().rev().take(n).cloned().collect()
    }

    pub fn kpis(&self) -> Kpis {
        self.kpis_at(Utc::now())
    }

    /// KPI 계산
    ///
    /// 평균 지연은 버퍼 전체, 성공률/처리량은 `now` 기준 최근 60초 윈도우.
    pub fn kpis_at(&self, now: DateTime<Utc>) -> Kpis {
        let events = self.events.read();
        if events.is_empty() {
            return Kpis::default();
        }

        let latency_sum: u128 = events.iter().map(|e| u128::from(e.latency_ms)).sum();
        let avg_latency_ms = (latency_sum / events.len() as u128) as u64;

        let cutoff = now - Duration::seconds(KPI_WINDOW_SECS);
        let (in_window, successes) = events
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .fold((0usize, 0usize), |(total, ok), e| {
                (total + 1, ok + usize::from(e.is_error_free()))
            });
        let success_rate_pct = if in_window == 0 {
            0.0
        } else {
            round_to(successes as f64 * 100.0 / in_window as f64, 2)
        };

        let profits: Vec<f64> = events.iter().filter_map(|e| e.profit).collect();
        let avg_profit = if profits.is_empty() {
            0.0
        } else {
            round_to(profits.iter().sum::<f64>() / profits.len() as f64, 2)
        };

        Kpis {
            avg_latency_ms,
            success_rate_pct,
            throughput_1m: in_window,
            avg_profit,
        }
    }

    /// 최근 `n`개 이벤트의 지연 (오래된 것부터)
    pub fn latency_series(&self, n: usize) -> Series<u64> {
        let events = self.events.read();
        let mut series = Series::default();
        for event in tail(&events, n) {
            series.push(time_label(&event.timestamp), event.latency_ms);
        }
        series
    }

    /// 분(`HH:MM`) 단위 이벤트 수, 존재하는 버킷 중 최근 `minutes`개
    ///
    /// 활동이 없는 분은 0으로 채우지 않는다.
    pub fn throughput_series(&self, minutes: usize) -> Series<usize> {
        let events = self.events.read();
        let mut series: Series<usize> = Series::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for event in events.iter() {
            let label = event.timestamp.format("%H:%M").to_string();
            match index.get(&label) {
                Some(&i) => series.values[i] += 1,
                None => {
                    index.insert(label.clone(), series.len());
                    series.push(label, 1);
                }
            }
        }

        let skip = series.len().saturating_sub(minutes);
        Series {
            labels: series.labels.split_off(skip),
            values: series.values.split_off(skip),
        }
    }

    /// 최근 `n`개 이벤트의 누적 손익 (선택 구간 첫 이벤트부터 0에서 시작)
    pub fn profit_series(&self, n: usize) -> Series<f64> {
        let events = self.events.read();
        let mut series = Series::default();
        let mut cumulative = 0.0;
        for event in tail(&events, n) {
            cumulative += event.profit.unwrap_or(0.0);
            series.push(time_label(&event.timestamp), round_to(cumulative, 4));
        }
        series
    }

    pub fn heatmap_matrix(&self, cols: usize) -> Heatmap {
        self.heatmap_matrix_at(cols, Utc::now())
    }

    /// `now`에서 끝나는 `cols`개의 연속 5초 윈도우 × 4개 지연 버킷
    ///
    /// 윈도우는 양 끝 포함이며, 이벤트는 오래된 윈도우부터 검사해 처음 맞는
    /// 칸 하나에만 집계된다.
    pub fn heatmap_matrix_at(&self, cols: usize, now: DateTime<Utc>) -> Heatmap {
        let windows: Vec<(DateTime<Utc>, DateTime<Utc>)> = (0..cols)
            .map(|i| {
                let start = now - Duration::seconds(HEATMAP_WINDOW_SECS * (cols - i) as i64);
                (start, start + Duration::seconds(HEATMAP_WINDOW_SECS))
            })
            .collect();

        let mut cells = vec![vec![0u32; cols]; HEATMAP_ROWS.len()];
        let events = self.events.read();
        for event in events.iter() {
            if let Some(col) = windows
                .iter()
                .position(|(start, end)| *start <= event.timestamp && event.timestamp <= *end)
            {
                cells[latency_bucket(event.latency_ms)][col] += 1;
            }
        }

        Heatmap {
            rows: HEATMAP_ROWS.iter().map(|r| r.to_string()).collect(),
            cols: windows.iter().map(|(start, _)| time_label(start)).collect(),
            cells,
        }
    }

    pub fn daily_summary(&self) -> DailySummary {
        self.daily_summary_at(Utc::now())
    }

    /// `now`와 같은 UTC 날짜의 이벤트 요약
    pub fn daily_summary_at(&self, now: DateTime<Utc>) -> DailySummary {
        let today = now.date_naive();
        let events = self.events.read();

        let mut total_events = 0usize;
        let mut latency_sum = 0u128;
        let mut successes = 0usize;
        let mut total_profit = 0.0;
        let mut status_counts = StatusCounts::default();
        let mut top_bots: Vec<BotProfit> = Vec::new();

        for event in events.iter().filter(|e| e.timestamp.date_naive() == today) {
            total_events += 1;
            latency_sum += u128::from(event.latency_ms);
            successes += usize::from(event.is_success());
            status_counts.record(event.effective_status());

            let profit = event.profit.unwrap_or(0.0);
            total_profit += profit;
            match top_bots.iter_mut().find(|b| b.bot_name == event.source_name) {
                Some(bot) => bot.profit += profit,
                None => top_bots.push(BotProfit {
                    bot_name: event.source_name.clone(),
                    profit,
                }),
            }
        }

        // 안정 정렬: 동률이면 먼저 등장한 봇이 앞
        top_bots.sort_by(|a, b| b.profit.total_cmp(&a.profit));
        top_bots.truncate(TOP_BOTS);
        for bot in &mut top_bots {
            bot.profit = round_to(bot.profit, 4);
        }

        let (avg_latency_ms, success_rate_pct) = if total_events == 0 {
            (0.0, 0.0)
        } else {
            (
                round_to(latency_sum as f64 / total_events as f64, 2),
                round_to(successes as f64 * 100.0 / total_events as f64, 2),
            )
        };

        DailySummary {
            date: today,
            total_events,
            avg_latency_ms,
            success_rate_pct,
            total_profit: round_to(total_profit, 4),
            status_counts,
            top_bots,
        }
    }

    /// 봇별 상태 (마지막 하트비트 내림차순)
    pub fn bot_health(&self) -> Vec<BotHealth> {
        struct Acc {
            bot_name: String,
            last_heartbeat: DateTime<Utc>,
            successes: usize,
            total: usize,
            latency_sum: u128,
        }

        let events = self.events.read();
        let mut order: Vec<Acc> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for event in events.iter() {
            let i = *index.entry(event.source_name.as_str()).or_insert_with(|| {
                order.push(Acc {
                    bot_name: event.source_name.clone(),
                    last_heartbeat: event.timestamp,
                    successes: 0,
                    total: 0,
                    latency_sum: 0,
                });
                order.len() - 1
            });
            let acc = &mut order[i];
            acc.last_heartbeat = event.timestamp;
            acc.total += 1;
            acc.latency_sum += u128::from(event.latency_ms);
            acc.successes += usize::from(event.is_success());
        }

        let mut bots: Vec<BotHealth> = order
            .into_iter()
            .map(|acc| BotHealth {
                bot_name: acc.bot_name,
                last_heartbeat: acc.last_heartbeat,
                success_ratio: round_to(acc.successes as f64 * 100.0 / acc.total as f64, 2),
                failure_count: acc.total - acc.successes,
                avg_latency_ms: round_to(acc.latency_sum as f64 / acc.total as f64, 2),
                total_count: acc.total,
            })
            .collect();
        bots.sort_by(|a, b| b.last_heartbeat.cmp(&a.last_heartbeat));
        bots
    }

    /// 봇 식별자(`arb-scout`)에 해당하는 이벤트의 성공률. 이벤트가 없으면 None.
    pub fn bot_success_rate(&self, bot_id: &str) -> Option<f64> {
        let events = self.events.read();
        let (total, successes) = events
            .iter()
            .filter(|e| bot_id_of(&e.source_name) == bot_id)
            .fold((0usize, 0usize), |(total, ok), e| {
                (total + 1, ok + usize::from(e.is_success()))
            });
        (total > 0).then(|| round_to(successes as f64 * 100.0 / total as f64, 2))
    }

    /// 봇 식별자에 해당하는 가장 최근 이벤트
    pub fn latest_for_bot(&self, bot_id: &str) -> Option<MetricEvent> {
        self.events
            .read()
            .iter()
            .rev()
            .find(|e| bot_id_of(&e.source_name) == bot_id)
            .cloned()
    }

    /// 최근 `n`개 이벤트의 지표 값 (최신 순)
    pub fn live_series(&self, metric: LiveMetric, n: usize) -> LiveSeries {
        let events = self.events.read();
        let mut series = LiveSeries::default();
        for event in events.iter().rev().take(n) {
            series.timestamps.push(event.timestamp.timestamp_millis());
            series.values.push(metric.value_of(event));
        }
        series
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot_at(Utc::now())
    }

    /// 렌더링용 스냅샷
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        DashboardSnapshot {
            kpis: self.kpis_at(now),
            latency_series: self.latency_series(DEFAULT_SERIES_LEN),
            throughput_series: self.throughput_series(DEFAULT_THROUGHPUT_MINUTES),
            profit_series: self.profit_series(DEFAULT_SERIES_LEN),
            heatmap: self.heatmap_matrix_at(DEFAULT_HEATMAP_COLS, now),
            last_events: self.recent(DEFAULT_RECENT),
        }
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// 마지막 `n`개 (오래된 것부터)
fn tail(events: &VecDeque<MetricEvent>, n: usize) -> impl Iterator<Item = &MetricEvent> {
    events.iter().skip(events.len().saturating_sub(n))
}

fn time_label(ts: &DateTime<Utc>) -> String {
    ts.format("%H:%M:%S").to_string()
}

fn latency_bucket(latency_ms: u64) -> usize {
    match latency_ms {
        0..=99 => 0,
        100..=199 => 1,
        200..=299 => 2,
        _ => 3,
    }
}

/// 소수점 `places`자리 반올림
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event_at(ts: DateTime<Utc>, bot: &str, latency: u64) -> MetricEvent {
        MetricEvent::new(ts, bot, latency)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn evicts_oldest_first() {
        let buffer = EventBuffer::new(3);
        let base = noon();
        for i in 0..5 {
            buffer.add(event_at(base + Duration::seconds(i), "bot", i as u64));
        }

        assert_eq!(buffer.len(), 3);
        let latencies: Vec<u64> = buffer.recent(10).iter().map(|e| e.latency_ms).collect();
        assert_eq!(latencies, vec![4, 3, 2]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let buffer = EventBuffer::new(7);
        for i in 0..100 {
            buffer.add(event_at(noon(), "bot", i));
            assert!(buffer.len() <= 7);
        }
    }

    #[test]
    fn recent_is_reverse_insertion_order() {
        let buffer = EventBuffer::new(10);
        for i in 0..4 {
            buffer.add(event_at(noon(), "bot", i));
        }

        let recent = buffer.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].latency_ms, 3);
        assert_eq!(recent[1].latency_ms, 2);
        assert_eq!(buffer.recent(DEFAULT_RECENT).len(), 4);
    }

    #[test]
    fn empty_buffer_kpis_are_zero() {
        let buffer = EventBuffer::new(10);
        let kpis = buffer.kpis();
        assert_eq!(
            kpis,
            Kpis {
                avg_latency_ms: 0,
                success_rate_pct: 0.0,
                throughput_1m: 0,
                avg_profit: 0.0,
            }
        );
    }

    #[test]
    fn success_rate_uses_last_minute_but_latency_uses_all() {
        let now = noon();
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(now - Duration::seconds(90), "a", 100));
        buffer.add(event_at(now - Duration::seconds(30), "a", 200));
        buffer.add(event_at(now - Duration::seconds(5), "a", 301).with_error("x"));

        let kpis = buffer.kpis_at(now);
        assert_eq!(kpis.success_rate_pct, 50.0);
        assert_eq!(kpis.throughput_1m, 2);
        // (100 + 200 + 301) / 3 = 200.33 → 200
        assert_eq!(kpis.avg_latency_ms, 200);
    }

    #[test]
    fn events_since_follows_cursor_across_eviction() {
        let buffer = EventBuffer::new(3);
        for i in 0..2 {
            buffer.add(event_at(noon(), "bot", i));
        }

        let (first, cursor) = buffer.events_since(0);
        assert_eq!(first.len(), 2);
        assert_eq!(cursor, 2);
        assert!(buffer.events_since(cursor).0.is_empty());

        // 커서 이후 4개 추가, 용량 3이라 하나는 이미 제거됨
        for i in 2..6 {
            buffer.add(event_at(noon(), "bot", i));
        }
        let (next, cursor) = buffer.events_since(cursor);
        let latencies: Vec<u64> = next.iter().map(|e| e.latency_ms).collect();
        assert_eq!(latencies, vec![3, 4, 5]);
        assert_eq!(cursor, 6);
    }

    #[test]
    fn huge_latencies_do_not_overflow_aggregates() {
        let now = noon();
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(now - Duration::seconds(2), "a", u64::MAX));
        buffer.add(event_at(now - Duration::seconds(1), "a", u64::MAX));

        assert_eq!(buffer.kpis_at(now).avg_latency_ms, u64::MAX);
        let summary = buffer.daily_summary_at(now);
        assert_eq!(summary.total_events, 2);
        assert!(summary.avg_latency_ms > 1e19);
        let health = buffer.bot_health();
        assert_eq!(health[0].total_count, 2);
        assert!(health[0].avg_latency_ms > 1e19);
        assert_eq!(buffer.snapshot_at(now).kpis.avg_latency_ms, u64::MAX);
    }

    #[test]
    fn avg_profit_ignores_missing_values() {
        let now = noon();
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(now, "a", 1).with_profit(1.0));
        buffer.add(event_at(now, "a", 1));
        buffer.add(event_at(now, "a", 1).with_profit(2.0));

        assert_eq!(buffer.kpis_at(now).avg_profit, 1.5);
    }

    #[test]
    fn latency_series_is_chronological_tail() {
        let base = noon();
        let buffer = EventBuffer::new(10);
        for i in 0..5 {
            buffer.add(event_at(base + Duration::seconds(i), "a", i as u64 * 10));
        }

        let series = buffer.latency_series(3);
        assert_eq!(series.values, vec![20, 30, 40]);
        assert_eq!(series.labels[0], "12:00:02");
    }

    #[test]
    fn throughput_series_skips_idle_minutes() {
        let base = noon();
        let buffer = EventBuffer::new(20);
        buffer.add(event_at(base, "a", 1));
        buffer.add(event_at(base + Duration::seconds(10), "a", 1));
        buffer.add(event_at(base + Duration::minutes(3), "a", 1));
        buffer.add(event_at(base + Duration::minutes(5), "a", 1));

        let series = buffer.throughput_series(30);
        assert_eq!(series.labels, vec!["12:00", "12:03", "12:05"]);
        assert_eq!(series.values, vec![2, 1, 1]);

        let truncated = buffer.throughput_series(2);
        assert_eq!(truncated.labels, vec!["12:03", "12:05"]);
    }

    #[test]
    fn profit_series_restarts_cumulative_at_slice() {
        let base = noon();
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(base, "a", 1).with_profit(5.0));
        buffer.add(event_at(base, "a", 1).with_profit(1.0));
        buffer.add(event_at(base, "a", 1));
        buffer.add(event_at(base, "a", 1).with_profit(-0.5));

        let series = buffer.profit_series(3);
        assert_eq!(series.values, vec![1.0, 1.0, 0.5]);
    }

    #[test]
    fn heatmap_assigns_each_event_once() {
        let now = noon();
        let buffer = EventBuffer::new(10);
        // 경계값: 두 윈도우에 걸치지만 앞 윈도우에만 집계
        buffer.add(event_at(now - Duration::seconds(5), "a", 50));
        buffer.add(event_at(now - Duration::seconds(1), "a", 150));
        buffer.add(event_at(now - Duration::seconds(59), "a", 250));
        buffer.add(event_at(now - Duration::seconds(30), "a", 999));
        // 범위 밖
        buffer.add(event_at(now - Duration::seconds(61), "a", 10));

        let heatmap = buffer.heatmap_matrix_at(12, now);
        assert_eq!(heatmap.rows.len(), 4);
        assert_eq!(heatmap.cols.len(), 12);
        assert_eq!(heatmap.cells.iter().flatten().sum::<u32>(), 4);

        assert_eq!(heatmap.cells[0][10], 1);
        assert_eq!(heatmap.cells[0][11], 0);
        assert_eq!(heatmap.cells[1][11], 1);
        assert_eq!(heatmap.cells[2][0], 1);
        // now-30은 5번(끝)과 6번(시작) 윈도우 모두에 걸침
        assert_eq!(heatmap.cells[3][5], 1);
        assert_eq!(heatmap.cells[3][6], 0);
    }

    #[test]
    fn daily_summary_counts_today_only() {
        let now = noon();
        let buffer = EventBuffer::new(20);
        buffer.add(event_at(now - Duration::days(1), "old", 1000).with_profit(100.0));
        buffer.add(event_at(now, "arb-scout", 100).with_profit(0.5));
        buffer.add(event_at(now, "mev-watch", 200).with_profit(1.5));
        buffer.add(
            event_at(now, "arb-scout", 300)
                .with_status(Some(EventStatus::Warning))
                .with_error("warning: slow"),
        );
        buffer.add(event_at(now, "tx-relay", 400).with_error("critical: boom"));

        let summary = buffer.daily_summary_at(now);
        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.avg_latency_ms, 250.0);
        assert_eq!(summary.success_rate_pct, 50.0);
        assert_eq!(summary.total_profit, 2.0);
        assert_eq!(
            summary.status_counts,
            StatusCounts {
                ok: 2,
                warning: 1,
                critical: 1
            }
        );
        assert_eq!(summary.top_bots[0].bot_name, "mev-watch");
        assert_eq!(summary.top_bots[1].bot_name, "arb-scout");
        assert_eq!(summary.top_bots.len(), 3);
    }

    #[test]
    fn daily_summary_empty_is_zero() {
        let summary = EventBuffer::new(5).daily_summary_at(noon());
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.success_rate_pct, 0.0);
        assert!(summary.top_bots.is_empty());
    }

    #[test]
    fn bot_health_sorted_by_heartbeat() {
        let base = noon();
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(base, "arb-scout", 100));
        buffer.add(event_at(base + Duration::seconds(1), "mev-watch", 300).with_error("x"));
        buffer.add(event_at(base + Duration::seconds(2), "arb-scout", 200));

        let health = buffer.bot_health();
        assert_eq!(health.len(), 2);
        assert_eq!(health[0].bot_name, "arb-scout");
        assert_eq!(health[0].total_count, 2);
        assert_eq!(health[0].avg_latency_ms, 150.0);
        assert_eq!(health[0].success_ratio, 100.0);
        assert_eq!(health[1].failure_count, 1);
        assert_eq!(health[1].success_ratio, 0.0);
    }

    #[test]
    fn bot_lookup_uses_slug() {
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(noon(), "Arb Scout", 10));
        buffer.add(event_at(noon(), "Arb Scout", 20).with_error("x"));

        assert_eq!(buffer.bot_success_rate("arb-scout"), Some(50.0));
        assert_eq!(buffer.latest_for_bot("arb-scout").unwrap().latency_ms, 20);
        assert_eq!(buffer.bot_success_rate("unknown"), None);
    }

    #[test]
    fn live_series_is_most_recent_first() {
        let base = noon();
        let buffer = EventBuffer::new(10);
        buffer.add(event_at(base, "a", 10));
        buffer.add(event_at(base + Duration::seconds(1), "a", 20).with_error("x"));

        let latency = buffer.live_series(LiveMetric::parse("latency"), DEFAULT_LIVE_LEN);
        assert_eq!(latency.values, vec![20.0, 10.0]);
        assert_eq!(latency.timestamps[0], (base + Duration::seconds(1)).timestamp_millis());

        let success = buffer.live_series(LiveMetric::parse("success_rate"), 60);
        assert_eq!(success.values, vec![0.0, 100.0]);

        assert_eq!(LiveMetric::parse("bogus"), LiveMetric::Latency);
    }

    #[test]
    fn snapshot_limits_last_events() {
        let buffer = EventBuffer::new(100);
        for i in 0..40 {
            buffer.add(event_at(noon(), "a", i));
        }
        let snapshot = buffer.snapshot_at(noon());
        assert_eq!(snapshot.last_events.len(), DEFAULT_RECENT);
        assert_eq!(snapshot.latency_series.len(), 40);
        assert_eq!(snapshot.heatmap.cols.len(), DEFAULT_HEATMAP_COLS);
    }
}
