//! 서버 측 HTML 렌더링.
//!
//! 실시간 메트릭 패널(SSE로 전송되는 조각)과 일일 리포트 페이지를 만든다.

use std::fmt::Write;

use phoenix_core::models::metric::{EventStatus, MetricEvent};
use phoenix_pipeline::buffer::{DailySummary, Heatmap, Series};
use phoenix_pipeline::{DashboardSnapshot, FragmentRenderer};

/// 스파크라인 SVG 크기
const SPARK_WIDTH: f64 = 240.0;
const SPARK_HEIGHT: f64 = 48.0;

/// 대시보드 HTML 렌더러
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 일일 요약 리포트 페이지
    pub fn render_report(&self, summary: &DailySummary) -> String {
        let mut html = String::with_capacity(4096);
        html.push_str(
            "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <title>Phoenix 일일 리포트</title>\n\
             <link rel=\"stylesheet\" href=\"/dashboard.css\">\n</head>\n<body>\n\
             <main class=\"report\">\n",
        );
        let _ = writeln!(
            html,
            "<h1>일일 리포트 <small>{}</small></h1>",
            summary.date.format("%Y-%m-%d")
        );

        html.push_str("<section class=\"kpis\">\n");
        kpi_card(&mut html, "이벤트", &summary.total_events.to_string());
        kpi_card(
            &mut html,
            "평균 지연",
            &format!("{:.2} ms", summary.avg_latency_ms),
        );
        kpi_card(
            &mut html,
            "성공률",
            &format!("{:.2}%", summary.success_rate_pct),
        );
        kpi_card(&mut html, "총 손익", &format!("{:.4}", summary.total_profit));
        html.push_str("</section>\n");

        let counts = &summary.status_counts;
        let _ = writeln!(
            html,
            "<section class=\"status-counts\"><span class=\"status ok\">ok {}</span> \
             <span class=\"status warning\">warning {}</span> \
             <span class=\"status critical\">critical {}</span></section>",
            counts.ok, counts.warning, counts.critical
        );

        html.push_str("<section><h2>상위 봇 (손익)</h2>\n");
        if summary.top_bots.is_empty() {
            html.push_str("<p class=\"empty\">오늘 기록된 이벤트가 없습니다</p>\n");
        } else {
            html.push_str("<table><thead><tr><th>봇</th><th>손익</th></tr></thead><tbody>\n");
            for bot in &summary.top_bots {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{:.4}</td></tr>",
                    escape_html(&bot.bot_name),
                    bot.profit
                );
            }
            html.push_str("</tbody></table>\n");
        }
        html.push_str("</section>\n<p><a href=\"/\">대시보드로 돌아가기</a></p>\n</main>\n</body>\n</html>\n");
        html
    }
}

impl FragmentRenderer for HtmlRenderer {
    fn render_metrics(&self, snapshot: &DashboardSnapshot) -> String {
        let mut html = String::with_capacity(8192);
        html.push_str("<div id=\"metrics\" class=\"metrics\">\n");

        let kpis = &snapshot.kpis;
        html.push_str("<section class=\"kpis\">\n");
        kpi_card(&mut html, "평균 지연", &format!("{} ms", kpis.avg_latency_ms));
        kpi_card(
            &mut html,
            "성공률 (1분)",
            &format!("{:.2}%", kpis.success_rate_pct),
        );
        kpi_card(&mut html, "처리량 (1분)", &kpis.throughput_1m.to_string());
        kpi_card(&mut html, "평균 손익", &format!("{:.4}", kpis.avg_profit));
        html.push_str("</section>\n");

        html.push_str("<section class=\"charts\">\n");
        chart_card(&mut html, "지연 (ms)", &snapshot.latency_series, |v| *v as f64);
        chart_card(&mut html, "처리량 (분당)", &snapshot.throughput_series, |v| {
            *v as f64
        });
        chart_card(&mut html, "손익", &snapshot.profit_series, |v| *v);
        html.push_str("</section>\n");

        render_heatmap(&mut html, &snapshot.heatmap);
        render_events(&mut html, &snapshot.last_events);

        html.push_str("</div>\n");
        html
    }
}

fn kpi_card(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        html,
        "<div class=\"kpi\"><span class=\"label\">{label}</span><span class=\"value\">{}</span></div>",
        escape_html(value)
    );
}

fn chart_card<T>(html: &mut String, title: &str, series: &Series<T>, to_f64: impl Fn(&T) -> f64) {
    let values: Vec<f64> = series.values.iter().map(to_f64).collect();
    let _ = writeln!(
        html,
        "<div class=\"chart\"><h3>{title}</h3>{}</div>",
        sparkline(&values)
    );
}

/// 값 목록 → 폴리라인 SVG
fn sparkline(values: &[f64]) -> String {
    if values.is_empty() {
        return "<p class=\"empty\">데이터 없음</p>".to_string();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let step = if values.len() > 1 {
        SPARK_WIDTH / (values.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = i as f64 * step;
            let y = SPARK_HEIGHT - (v - min) / span * SPARK_HEIGHT;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    format!(
        "<svg class=\"spark\" viewBox=\"0 0 {SPARK_WIDTH} {SPARK_HEIGHT}\" preserveAspectRatio=\"none\">\
         <polyline fill=\"none\" points=\"{}\"/></svg>",
        points.join(" ")
    )
}

fn render_heatmap(html: &mut String, heatmap: &Heatmap) {
    html.push_str("<section class=\"heatmap\"><h3>지연 히트맵 (최근 1분)</h3>\n<table>\n<thead><tr><th></th>");
    for col in &heatmap.cols {
        let _ = write!(html, "<th>{}</th>", escape_html(col));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    let max = heatmap.max_cell().max(1);
    for (row, cells) in heatmap.rows.iter().zip(&heatmap.cells) {
        let _ = write!(html, "<tr><th>{}</th>", escape_html(row));
        for count in cells {
            // 0..=4 단계 농도
            let level = (*count * 4).div_ceil(max);
            let _ = write!(html, "<td class=\"cell l{level}\">{count}</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
}

fn render_events(html: &mut String, events: &[MetricEvent]) {
    html.push_str("<section class=\"events\"><h3>최근 이벤트</h3>\n");
    if events.is_empty() {
        html.push_str("<p class=\"empty\">아직 수신된 이벤트가 없습니다</p>\n</section>\n");
        return;
    }
    html.push_str(
        "<table>\n<thead><tr><th>시각</th><th>봇</th><th>지연</th><th>tx</th>\
         <th>상태</th><th>손익</th></tr></thead>\n<tbody>\n",
    );
    for event in events {
        let status = event.effective_status();
        let profit = event
            .profit
            .map(|p| format!("{p:.4}"))
            .unwrap_or_else(|| "-".to_string());
        let title = event
            .error
            .as_deref()
            .map(|e| format!(" title=\"{}\"", escape_html(e)))
            .unwrap_or_default();
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{} ms</td><td class=\"tx\">{}</td>\
             <td><span class=\"status {status}\"{title}>{status}</span></td><td>{profit}</td></tr>",
            event.timestamp.format("%H:%M:%S"),
            escape_html(&event.source_name),
            event.latency_ms,
            escape_html(&event.tx_reference),
        );
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
}

/// `/events` 스트림의 이벤트 한 줄
pub fn event_row(event: &MetricEvent) -> String {
    let (class, label) = if event.is_success() {
        ("ok", "OK")
    } else {
        match event.status {
            Some(EventStatus::Warning) => ("warning", "WARNING"),
            Some(EventStatus::Critical) => ("critical", "CRITICAL"),
            // 상태는 ok인데 에러가 있는 경우
            Some(EventStatus::Ok) => ("critical", "OK"),
            None => ("critical", "ERROR"),
        }
    };
    let mut html = format!(
        "<div class=\"event-item\"><span class=\"ts\">{}</span> <b>{}</b> \
         <span class=\"latency\">{}ms</span> <span class=\"status {class}\">{label}</span>",
        event.timestamp.format("%H:%M:%S"),
        escape_html(&event.source_name),
        event.latency_ms,
    );
    if !event.tx_reference.is_empty() {
        let _ = write!(html, " <span class=\"tx\">{}</span>", escape_html(&event.tx_reference));
    }
    html.push_str("</div>\n");
    html
}

/// `/logs/stream`의 로그 항목 한 줄
pub fn log_entry(event: &MetricEvent) -> String {
    let mut html = format!(
        "<div class=\"log-entry\"><span class=\"ts\">{}</span> <b>{}</b> \
         <span class=\"latency\">{}ms</span>",
        event.timestamp.format("%H:%M:%S"),
        escape_html(&event.source_name),
        event.latency_ms,
    );
    if let Some(error) = &event.error {
        let _ = write!(html, " <span class=\"status critical\">{}</span>", escape_html(error));
    }
    html.push_str("</div>\n");
    html
}

/// `/charts/mini` 막대 하나 (초 단위)
pub fn mini_bar(latency_ms: u64) -> String {
    let secs = latency_ms as f64 / 1000.0;
    format!("<li style=\"--size: {secs:.3};\">{secs:.3}s</li>\n")
}

/// HTML 특수문자 이스케이프
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use phoenix_pipeline::buffer::{BotProfit, StatusCounts};
    use phoenix_pipeline::EventBuffer;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b a=\"1\">&'"),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let buffer = EventBuffer::new(10);
        let html = HtmlRenderer::new().render_metrics(&buffer.snapshot());
        assert!(html.starts_with("<div id=\"metrics\""));
        assert!(html.contains("아직 수신된 이벤트가 없습니다"));
        assert!(html.contains("0 ms"));
    }

    #[test]
    fn snapshot_lists_events_escaped() {
        let buffer = EventBuffer::new(10);
        buffer.add(
            MetricEvent::new(Utc::now(), "<script>", 120)
                .with_tx_reference("0xabc")
                .with_error("boom"),
        );
        let html = HtmlRenderer::new().render_metrics(&buffer.snapshot());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("status critical"));
        assert!(html.contains("title=\"boom\""));
        assert!(html.contains("<polyline"));
    }

    #[test]
    fn sparkline_handles_flat_series() {
        let svg = sparkline(&[5.0, 5.0, 5.0]);
        assert!(svg.contains("0.0,48.0"));
        assert!(svg.contains("240.0,48.0"));
    }

    #[test]
    fn report_page_shows_totals() {
        let summary = DailySummary {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            total_events: 12,
            avg_latency_ms: 101.5,
            success_rate_pct: 91.67,
            total_profit: 0.1234,
            status_counts: StatusCounts {
                ok: 10,
                warning: 1,
                critical: 1,
            },
            top_bots: vec![BotProfit {
                bot_name: "arb-scout".to_string(),
                profit: 0.1,
            }],
        };
        let html = HtmlRenderer::new().render_report(&summary);
        assert!(html.contains("2026-03-01"));
        assert!(html.contains("91.67%"));
        assert!(html.contains("<td>arb-scout</td>"));
        assert!(html.contains("critical 1"));
    }

    #[test]
    fn event_row_labels_and_escapes() {
        let now = Utc::now();
        let ok = event_row(&MetricEvent::new(now, "arb<1>", 120).with_tx_reference("0xabc...def"));
        assert!(ok.contains("arb&lt;1&gt;"));
        assert!(ok.contains("120ms"));
        assert!(ok.contains("status ok\">OK"));
        assert!(ok.contains("0xabc...def"));

        let warn = event_row(
            &MetricEvent::new(now, "b", 1)
                .with_error("slow")
                .with_status(Some(EventStatus::Warning)),
        );
        assert!(warn.contains("status warning\">WARNING"));

        let critical = event_row(&MetricEvent::new(now, "c", 1).with_error("boom"));
        assert!(critical.contains("status critical\">CRITICAL"));
        assert!(!critical.contains("class=\"tx\""));

        let unlabeled = event_row(&MetricEvent::new(now, "d", 1).with_error("boom").with_status(None));
        assert!(unlabeled.contains("status critical\">ERROR"));
    }

    #[test]
    fn log_entry_shows_error() {
        let entry = log_entry(&MetricEvent::new(Utc::now(), "mev", 80).with_error("<reverted>"));
        assert!(entry.starts_with("<div class=\"log-entry\">"));
        assert!(entry.contains("80ms"));
        assert!(entry.contains("&lt;reverted&gt;"));
    }

    #[test]
    fn mini_bar_is_seconds() {
        assert_eq!(mini_bar(1500), "<li style=\"--size: 1.500;\">1.500s</li>\n");
    }
}
