//! Polling controller: fetch updates once, or repeatedly until a wall-clock deadline.

use chrono::Local;
use manager_core::{ApiResponse, BotClient, Update, UPDATE_TARGET};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::output::OutputBuffer;
use crate::params::ParamSet;

/// Loop length used when `l` is given but blank: 7 days.
pub const DEFAULT_LOOP_SECONDS: u64 = 604_800;
/// Delay between fetches when `i` is absent or blank.
pub const DEFAULT_LOOP_INTERVAL_SECONDS: u64 = 2;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats one fetch result into output text, replacing [`format_updates`].
pub type UpdatesCallback = Box<dyn Fn(&ApiResponse<Vec<Update>>) -> String + Send + Sync>;

/// Leading-integer coercion: optional surrounding whitespace, optional sign, leading digits.
/// Anything without leading digits is 0; out-of-range values saturate.
pub fn coerce_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Seconds to keep polling (`l`): absent -> 0 (single fetch), blank -> 7 days, otherwise the
/// coerced number floored at 0.
pub fn loop_seconds(params: &ParamSet) -> u64 {
    match params.script_param("l") {
        None => 0,
        Some(raw) if raw.trim().is_empty() => DEFAULT_LOOP_SECONDS,
        Some(raw) => coerce_int(raw).max(0).unsigned_abs(),
    }
}

/// Seconds between fetches (`i`): absent or blank -> 2, otherwise the coerced number, at least 1.
pub fn loop_interval_seconds(params: &ParamSet) -> u64 {
    match params.script_param("i") {
        None => DEFAULT_LOOP_INTERVAL_SECONDS,
        Some(raw) if raw.trim().is_empty() => DEFAULT_LOOP_INTERVAL_SECONDS,
        Some(raw) => coerce_int(raw).max(1).unsigned_abs(),
    }
}

/// Collapses runs of whitespace into single spaces and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One line per update: `<chat id or n/a>: <type> (<content>)`.
pub fn format_update(update: &Update) -> String {
    let chat_id = update
        .chat_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    let text = match update.content.as_deref() {
        Some(content) => format!("{} ({})", update.update_type, content),
        None => update.update_type.clone(),
    };
    format!("{}: {}", chat_id, normalize_whitespace(&text))
}

/// Default formatter: `<timestamp> - Updates processed: N` plus one line per update, or
/// `<timestamp> - Failed to fetch updates: <error>` on a remote failure.
pub fn format_updates(response: &ApiResponse<Vec<Update>>) -> String {
    let now = Local::now().format(TIMESTAMP_FORMAT);

    if !response.is_ok() {
        return format!("{} - Failed to fetch updates: {}\n", now, response.error_text());
    }

    let updates = response.result.as_deref().unwrap_or_default();
    let mut out = format!("{} - Updates processed: {}\n", now, updates.len());
    for update in updates {
        out.push_str(&format_update(update));
        out.push('\n');
    }
    out
}

/// Fetches once and appends the formatted result. Remote failures are rendered, never raised.
#[instrument(skip(client, callback, output))]
pub async fn fetch_once<C>(
    client: &C,
    callback: Option<&UpdatesCallback>,
    output: &mut OutputBuffer,
) where
    C: BotClient + ?Sized,
{
    let response = client.fetch_updates().await;
    match &response.result {
        Some(updates) if response.is_ok() => {
            for update in updates {
                debug!(target: UPDATE_TARGET, update = ?update, "fetched update");
            }
            info!(count = updates.len(), "step: updates fetched");
        }
        _ => info!(error = %response.error_text(), "step: fetching updates failed"),
    }

    let text = match callback {
        Some(callback) => callback(&response),
        None => format_updates(&response),
    };
    output.push(&text);
}

/// Repeats [`fetch_once`] until `total` has elapsed, sleeping `interval` after each fetch. The
/// deadline is checked against the clock before every fetch, so slow fetches reduce the number of
/// iterations but not the window.
#[instrument(skip(client, callback, output))]
pub async fn fetch_loop<C>(
    client: &C,
    callback: Option<&UpdatesCallback>,
    output: &mut OutputBuffer,
    total: Duration,
    interval: Duration,
) where
    C: BotClient + ?Sized,
{
    let deadline = Instant::now().checked_add(total);
    let until = chrono::Duration::from_std(total)
        .ok()
        .and_then(|d| Local::now().checked_add_signed(d))
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "further notice".to_string());

    info!(until = %until, interval_secs = interval.as_secs(), "step: polling loop started");
    output.push_line(&format!("Looping getUpdates until {}", until));

    while deadline.map_or(true, |deadline| Instant::now() < deadline) {
        fetch_once(client, callback, output).await;
        tokio::time::sleep(interval).await;
    }

    info!("step: polling loop finished");
}
