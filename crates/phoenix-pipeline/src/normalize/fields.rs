//! 필드 추출 규칙 테이블.
//!
//! 논리 속성마다 후보 키를 우선순위 순서로 나열한다. 새 입력 필드명은
//! 테이블에 한 줄을 추가하면 된다.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::NormalizeError;

type Object = Map<String, Value>;

/// 타임스탬프 추출 규칙
#[derive(Debug, Clone, Copy)]
pub(crate) enum TimestampRule {
    /// ISO-8601 문자열
    Iso(&'static str),
    /// epoch 초 (숫자)
    EpochSecs(&'static str),
}

/// 지연 추출 규칙
#[derive(Debug, Clone, Copy)]
pub(crate) enum LatencyRule {
    /// 밀리초
    Millis(&'static str),
    /// 1000 미만이면 초, 아니면 이미 밀리초
    SecondsOrMillis(&'static str),
}

pub(crate) const TIMESTAMP_RULES: &[TimestampRule] = &[
    TimestampRule::Iso("timestamp"),
    TimestampRule::Iso("time"),
    TimestampRule::EpochSecs("ts"),
];

pub(crate) const LATENCY_RULES: &[LatencyRule] = &[
    LatencyRule::Millis("latency_ms"),
    LatencyRule::SecondsOrMillis("latency"),
];

pub(crate) const BOT_NAME_KEYS: &[&str] = &["bot_name", "bot", "name"];
pub(crate) const TX_KEYS: &[&str] = &["tx_hash", "hash", "tx", "transaction_hash"];
pub(crate) const ERROR_KEYS: &[&str] = &["error", "err", "message"];
/// 로그 레코드에서는 message가 본문이므로 에러 후보에서 제외
pub(crate) const LOG_ERROR_KEYS: &[&str] = &["error", "err"];
pub(crate) const STATUS_KEYS: &[&str] = &["status"];
pub(crate) const PROFIT_KEYS: &[&str] = &["profit"];
pub(crate) const MESSAGE_KEYS: &[&str] = &["message", "msg"];
pub(crate) const LEVEL_KEYS: &[&str] = &["levelno", "level"];

/// 허용하는 최대 지연 (24시간)
pub(crate) const MAX_LATENCY_MS: u64 = 86_400_000;

/// 봇 이름이 없을 때 기본값
pub(crate) const DEFAULT_BOT_NAME: &str = "silverback";

static TX_HASH_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]{64}").ok());
static FREE_TEXT_LATENCY_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)s \(").ok());
static FEES_PAID_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)total fees paid\s*=\s*(\d+)").ok());

/// wei → ETH
const WEI_PER_ETH: f64 = 1e18;

/// 규칙 순서대로 타임스탬프 해석. 해당 필드가 하나도 없으면 None.
pub(crate) fn timestamp(obj: &Object) -> Result<Option<DateTime<Utc>>, NormalizeError> {
    for rule in TIMESTAMP_RULES {
        match *rule {
            TimestampRule::Iso(key) => {
                if let Some(raw) = obj.get(key).and_then(Value::as_str) {
                    return parse_iso(raw)
                        .map(Some)
                        .ok_or_else(|| NormalizeError::InvalidTimestamp {
                            field: key,
                            value: raw.to_string(),
                        });
                }
            }
            TimestampRule::EpochSecs(key) => {
                if let Some(secs) = obj.get(key).and_then(Value::as_f64) {
                    return from_epoch_secs(secs).map(Some).ok_or_else(|| {
                        NormalizeError::InvalidTimestamp {
                            field: key,
                            value: secs.to_string(),
                        }
                    });
                }
            }
        }
    }
    Ok(None)
}

/// ISO-8601 해석. 오프셋이 없으면 UTC로 간주.
pub(crate) fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

/// 규칙 순서대로 지연(ms) 해석. 해당 필드가 없으면 None.
pub(crate) fn latency_ms(obj: &Object) -> Result<Option<u64>, NormalizeError> {
    for rule in LATENCY_RULES {
        let (key, value) = match *rule {
            LatencyRule::Millis(key) => match obj.get(key).and_then(Value::as_f64) {
                Some(v) => (key, v),
                None => continue,
            },
            LatencyRule::SecondsOrMillis(key) => match obj.get(key).and_then(Value::as_f64) {
                Some(v) if v < 1000.0 => (key, v * 1000.0),
                Some(v) => (key, v),
                None => continue,
            },
        };
        if !value.is_finite() || value < 0.0 {
            return Err(NormalizeError::InvalidField {
                field: key,
                reason: format!("음수 또는 비정상 지연: {value}"),
            });
        }
        if value > MAX_LATENCY_MS as f64 {
            return Err(NormalizeError::InvalidField {
                field: key,
                reason: format!("지연 범위 초과: {value}"),
            });
        }
        return Ok(Some(value.trunc() as u64));
    }
    Ok(None)
}

/// 자유 텍스트의 `N.NNNs (` 패턴에서 지연(ms) 추출
pub(crate) fn free_text_latency_ms(text: &str) -> Option<u64> {
    let caps = FREE_TEXT_LATENCY_RE.as_ref()?.captures(text)?;
    let secs: f64 = caps.get(1)?.as_str().parse().ok()?;
    let millis = (secs * 1000.0).round();
    (millis.is_finite() && millis <= MAX_LATENCY_MS as f64).then_some(millis as u64)
}

/// 첫 번째 비어 있지 않은 문자열 값
pub(crate) fn first_str<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// 첫 번째 유효 값을 문자열로 (null, 빈 문자열, false는 없음으로 취급)
pub(crate) fn first_text(obj: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

pub(crate) fn first_f64(obj: &Object, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_f64))
        .filter(|v| v.is_finite())
}

pub(crate) fn bot_name(obj: &Object) -> String {
    first_str(obj, BOT_NAME_KEYS)
        .unwrap_or(DEFAULT_BOT_NAME)
        .to_string()
}

/// 필드에서 트랜잭션 해시를 찾아 축약
pub(crate) fn tx_reference(obj: &Object) -> Option<String> {
    first_str(obj, TX_KEYS).map(shorten_tx_reference)
}

/// 자유 텍스트에서 66자 해시를 찾아 축약
pub(crate) fn free_text_tx_reference(text: &str) -> Option<String> {
    TX_HASH_RE
        .as_ref()?
        .find(text)
        .map(|m| shorten_tx_reference(m.as_str()))
}

/// 자유 텍스트의 `total fees paid = N`(wei)을 음수 손익으로 환산
pub(crate) fn free_text_fee_profit(text: &str) -> Option<f64> {
    let caps = FEES_PAID_RE.as_ref()?.captures(text)?;
    let wei: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(-(wei / WEI_PER_ETH))
}

/// 표시용 트랜잭션 참조: 앞 10자 + "..." + 뒤 6자
///
/// 12자 미만은 그대로 반환하고, "0x"가 없으면 붙인다. 이미 축약된 값을 다시
/// 넣어도 결과는 같다.
pub fn shorten_tx_reference(raw: &str) -> String {
    if raw.chars().count() < 12 {
        return raw.to_string();
    }
    let prefixed = if raw.starts_with("0x") {
        raw.to_string()
    } else {
        format!("0x{raw}")
    };
    let chars: Vec<char> = prefixed.chars().collect();
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}
