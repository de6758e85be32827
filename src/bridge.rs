//! The message contract between the widget and the app that owns the
//! calendar data.  The app pushes per-day event data in, and the widget asks
//! for a sync whenever its data may be stale.
use crate::datekey::DateKey;
use crate::store::{StoreDir, StoreError, LAST_SYNC_REQUEST, NEEDS_SYNC, NEXT_EVENT_TITLE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Headline stored when an update carries no event title
pub(crate) static NO_UPCOMING_EVENTS: &str = "No upcoming events";

/// Headline shown while a freshly configured widget waits for its first sync
pub(crate) static CHECKING_EVENTS: &str = "Checking your events...";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "method", content = "arguments", rename_all = "camelCase")]
pub(crate) enum BridgeRequest {
    /// Replace the next-event headline and record events for the given days.
    /// Day keys use the same `Y-M-D` format as the store.
    #[serde(rename_all = "camelCase")]
    UpdateCalendarWidget {
        #[serde(default)]
        event_title: Option<String>,
        #[serde(default)]
        event_days: Option<BTreeMap<String, bool>>,
        #[serde(default)]
        event_titles: Option<BTreeMap<String, String>>,
    },
    /// Ask whether the widget has requested fresh data
    CheckForWidgetSync,
    /// Ask the app to push fresh data
    RefreshWidget,
    /// A widget has just been placed; show a placeholder and request a sync
    ConfigureWidget,
}

impl BridgeRequest {
    fn error_code(&self) -> ErrorCode {
        match self {
            BridgeRequest::UpdateCalendarWidget { .. } => ErrorCode::UpdateWidgetError,
            BridgeRequest::CheckForWidgetSync => ErrorCode::SyncCheckError,
            BridgeRequest::RefreshWidget => ErrorCode::RefreshWidgetError,
            BridgeRequest::ConfigureWidget => ErrorCode::ConfigureWidgetError,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ErrorCode {
    UpdateWidgetError,
    SyncCheckError,
    RefreshWidgetError,
    ConfigureWidgetError,
    BadRequest,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum BridgeResponse {
    Success(bool),
    Error { code: ErrorCode, message: String },
}

/// Handles bridge requests against the preference files in a data directory
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Bridge {
    dir: StoreDir,
}

impl Bridge {
    pub(crate) fn new(dir: StoreDir) -> Bridge {
        Bridge { dir }
    }

    /// Parse and handle a single JSON-encoded request
    pub(crate) fn handle_json(&self, input: &str, now: OffsetDateTime) -> BridgeResponse {
        match serde_json::from_str::<BridgeRequest>(input) {
            Ok(request) => self.handle(&request, now),
            Err(e) => {
                log::warn!("rejecting malformed bridge request: {e}");
                BridgeResponse::Error {
                    code: ErrorCode::BadRequest,
                    message: e.to_string(),
                }
            }
        }
    }

    pub(crate) fn handle(&self, request: &BridgeRequest, now: OffsetDateTime) -> BridgeResponse {
        let r = match request {
            BridgeRequest::UpdateCalendarWidget {
                event_title,
                event_days,
                event_titles,
            } => self.update(
                event_title.as_deref(),
                event_days.as_ref(),
                event_titles.as_ref(),
            ),
            BridgeRequest::CheckForWidgetSync => self.check_for_sync(),
            BridgeRequest::RefreshWidget => self.request_sync(),
            BridgeRequest::ConfigureWidget => self.configure(now),
        };
        match r {
            Ok(b) => BridgeResponse::Success(b),
            Err(e) => {
                let code = request.error_code();
                let message = format!("{:#}", anyhow::Error::new(e));
                log::error!("bridge request failed: {message}");
                BridgeResponse::Error { code, message }
            }
        }
    }

    fn update(
        &self,
        event_title: Option<&str>,
        event_days: Option<&BTreeMap<String, bool>>,
        event_titles: Option<&BTreeMap<String, String>>,
    ) -> Result<bool, StoreError> {
        let path = self.dir.events_path();
        let mut events = self.dir.load_events()?;
        events.set_text(NEXT_EVENT_TITLE, event_title.unwrap_or(NO_UPCOMING_EVENTS));
        let mut days = 0;
        for (key, &has_events) in event_days.into_iter().flatten() {
            if let Some(key) = parse_key(key) {
                events.set_bool(&key.has_events_key(), has_events);
                days += 1;
            }
        }
        for (key, title) in event_titles.into_iter().flatten() {
            if let Some(key) = parse_key(key) {
                events.set_text(&key.event_title_key(), title);
            }
        }
        events.save(&path)?;
        log::info!("updated widget data for {days} day(s)");
        let mut sync = self.dir.load_sync()?;
        sync.set_bool(NEEDS_SYNC, false);
        sync.save(&self.dir.sync_path())?;
        Ok(true)
    }

    fn check_for_sync(&self) -> Result<bool, StoreError> {
        let sync = self.dir.load_sync()?;
        let needs_sync = sync.get_bool(NEEDS_SYNC, false);
        log::debug!(
            "widget sync needed: {needs_sync} (last requested at {} ms)",
            sync.get_int(LAST_SYNC_REQUEST, 0)
        );
        Ok(needs_sync)
    }

    fn request_sync(&self) -> Result<bool, StoreError> {
        let mut sync = self.dir.load_sync()?;
        sync.set_bool(NEEDS_SYNC, true);
        sync.save(&self.dir.sync_path())?;
        log::info!("widget refresh requested");
        Ok(true)
    }

    fn configure(&self, now: OffsetDateTime) -> Result<bool, StoreError> {
        let mut events = self.dir.load_events()?;
        events.set_text(NEXT_EVENT_TITLE, CHECKING_EVENTS);
        events.save(&self.dir.events_path())?;
        let mut sync = self.dir.load_sync()?;
        sync.set_bool(NEEDS_SYNC, true);
        sync.set_int(LAST_SYNC_REQUEST, unix_millis(now));
        sync.save(&self.dir.sync_path())?;
        log::info!("widget configured; waiting for first sync");
        Ok(true)
    }
}

fn parse_key(key: &str) -> Option<DateKey> {
    match DateKey::parse(key) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("skipping event data for bad day key: {e}");
            None
        }
    }
}

fn unix_millis(now: OffsetDateTime) -> i64 {
    i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EventRecord, EventStore};
    use std::fs;
    use tempfile::{tempdir, TempDir};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-10-18 09:30 UTC);

    fn setup() -> (TempDir, Bridge) {
        let tmp = tempdir().unwrap();
        let bridge = Bridge::new(StoreDir::new(tmp.path()));
        (tmp, bridge)
    }

    #[test]
    fn test_parse_requests() {
        let req = serde_json::from_str::<BridgeRequest>(
            r#"{
                "method": "updateCalendarWidget",
                "arguments": {
                    "eventTitle": "Brunch",
                    "eventDays": {"2026-10-18": true},
                    "eventTitles": {"2026-10-18": "Brunch"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            req,
            BridgeRequest::UpdateCalendarWidget {
                event_title: Some(String::from("Brunch")),
                event_days: Some(BTreeMap::from([(String::from("2026-10-18"), true)])),
                event_titles: Some(BTreeMap::from([(
                    String::from("2026-10-18"),
                    String::from("Brunch")
                )])),
            }
        );
        let req = serde_json::from_str::<BridgeRequest>(r#"{"method": "refreshWidget"}"#).unwrap();
        assert_eq!(req, BridgeRequest::RefreshWidget);
    }

    #[test]
    fn test_response_json() {
        assert_eq!(
            serde_json::to_string(&BridgeResponse::Success(true)).unwrap(),
            r#"{"success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&BridgeResponse::Error {
                code: ErrorCode::UpdateWidgetError,
                message: String::from("oops"),
            })
            .unwrap(),
            r#"{"error":{"code":"UPDATE_WIDGET_ERROR","message":"oops"}}"#
        );
    }

    #[test]
    fn test_update_writes_store() {
        let (_tmp, bridge) = setup();
        assert_eq!(
            bridge.handle(&BridgeRequest::RefreshWidget, NOW),
            BridgeResponse::Success(true)
        );
        let r = bridge.handle_json(
            r#"{"method": "updateCalendarWidget", "arguments": {
                "eventTitle": "Dentist appointment",
                "eventDays": {"2026-10-5": true, "2026-10-21": true, "2026-13-1": true},
                "eventTitles": {"2026-10-05": "Dentist appointment"}
            }}"#,
            NOW,
        );
        assert_eq!(r, BridgeResponse::Success(true));
        let events = bridge.dir.load_events().unwrap();
        assert_eq!(
            events.get_text(NEXT_EVENT_TITLE),
            Some("Dentist appointment")
        );
        assert_eq!(
            events.lookup(&DateKey::encode(2026, 9, 5)),
            EventRecord {
                has_events: true,
                title: String::from("Dentist appointment"),
            }
        );
        assert!(events.lookup(&DateKey::encode(2026, 9, 21)).has_events);
        assert!(!events.get_bool("has_events_2026-13-1", false));
        assert_eq!(
            bridge.handle(&BridgeRequest::CheckForWidgetSync, NOW),
            BridgeResponse::Success(false)
        );
    }

    #[test]
    fn test_update_defaults_title() {
        let (_tmp, bridge) = setup();
        let r = bridge.handle_json(
            r#"{"method": "updateCalendarWidget", "arguments": {}}"#,
            NOW,
        );
        assert_eq!(r, BridgeResponse::Success(true));
        let events = bridge.dir.load_events().unwrap();
        assert_eq!(events.get_text(NEXT_EVENT_TITLE), Some(NO_UPCOMING_EVENTS));
    }

    #[test]
    fn test_sync_handshake() {
        let (_tmp, bridge) = setup();
        assert_eq!(
            bridge.handle(&BridgeRequest::CheckForWidgetSync, NOW),
            BridgeResponse::Success(false)
        );
        bridge.handle(&BridgeRequest::RefreshWidget, NOW);
        assert_eq!(
            bridge.handle(&BridgeRequest::CheckForWidgetSync, NOW),
            BridgeResponse::Success(true)
        );
    }

    #[test]
    fn test_configure() {
        let (_tmp, bridge) = setup();
        assert_eq!(
            bridge.handle(&BridgeRequest::ConfigureWidget, NOW),
            BridgeResponse::Success(true)
        );
        let events = bridge.dir.load_events().unwrap();
        assert_eq!(events.get_text(NEXT_EVENT_TITLE), Some(CHECKING_EVENTS));
        let sync = bridge.dir.load_sync().unwrap();
        assert!(sync.get_bool(NEEDS_SYNC, false));
        assert_eq!(sync.get_int(LAST_SYNC_REQUEST, 0), 1_792_315_800_000);
    }

    #[test]
    fn test_update_keeps_foreign_values() {
        let (tmp, bridge) = setup();
        fs::write(
            tmp.path().join("CalendarWidgetPrefs.json"),
            r#"{"widgetOpacity": 0.8, "lastCalendarId": null}"#,
        )
        .unwrap();
        let r = bridge.handle_json(
            r#"{"method": "updateCalendarWidget", "arguments": {
                "eventTitle": "Review",
                "eventDays": {"2024-2-5": true},
                "eventTitles": {"2024-2-5": "Review"}
            }}"#,
            NOW,
        );
        assert_eq!(r, BridgeResponse::Success(true));
        let src = fs::read_to_string(tmp.path().join("CalendarWidgetPrefs.json")).unwrap();
        let json = serde_json::from_str::<serde_json::Value>(&src).unwrap();
        assert_eq!(json["widgetOpacity"], serde_json::json!(0.8));
        assert_eq!(json["lastCalendarId"], serde_json::Value::Null);
        assert_eq!(json["event_title_2024-2-5"], "Review");
    }

    #[test]
    fn test_bad_request() {
        let (_tmp, bridge) = setup();
        let r = bridge.handle_json(r#"{"method": "launchRockets"}"#, NOW);
        assert!(matches!(
            r,
            BridgeResponse::Error {
                code: ErrorCode::BadRequest,
                ..
            }
        ));
    }

    #[test]
    fn test_store_failure_maps_to_code() {
        let (tmp, bridge) = setup();
        fs::write(tmp.path().join("WidgetSyncPrefs.json"), "[1, 2").unwrap();
        let r = bridge.handle(&BridgeRequest::RefreshWidget, NOW);
        let BridgeResponse::Error { code, message } = r else {
            panic!("refresh should have failed: {r:?}");
        };
        assert_eq!(code, ErrorCode::RefreshWidgetError);
        assert!(message.starts_with("failed to parse "));
    }
}
