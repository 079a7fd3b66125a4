//! Wire format for the ingestion API.
//!
//! Each telemetry item travels as an `Envelope` whose `data.baseData` holds the
//! item-specific payload. A batch is a JSON array of envelopes.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{format_duration, EventTelemetry, RequestTelemetry, TraceTelemetry};

const ENVELOPE_EVENT: &str = "Microsoft.ApplicationInsights.Event";
const ENVELOPE_MESSAGE: &str = "Microsoft.ApplicationInsights.Message";
const ENVELOPE_REQUEST: &str = "Microsoft.ApplicationInsights.Request";

/// Schema version of every data payload
const DATA_VERSION: u8 = 2;

pub(crate) const TAG_SDK_VERSION: &str = "ai.internal.sdkVersion";
const TAG_OPERATION_ID: &str = "ai.operation.id";
const TAG_OPERATION_NAME: &str = "ai.operation.name";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    pub name: &'static str,
    pub time: String,
    #[serde(rename = "iKey")]
    pub i_key: String,
    pub tags: HashMap<String, String>,
    pub data: Data,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Data {
    pub base_type: &'static str,
    pub base_data: BaseData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum BaseData {
    Event(EventData),
    Message(MessageData),
    Request(RequestData),
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EventData {
    pub ver: u8,
    pub name: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageData {
    pub ver: u8,
    pub message: String,
    pub severity_level: u8,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestData {
    pub ver: u8,
    pub id: String,
    pub name: String,
    pub url: String,
    pub duration: String,
    pub response_code: String,
    pub success: bool,
}

/// Reply from `POST /v2/track`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackResponse {
    #[serde(default)]
    pub items_received: u64,
    #[serde(default)]
    pub items_accepted: u64,
    #[serde(default)]
    pub errors: Vec<TrackError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackError {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
}

impl Envelope {
    fn new(
        name: &'static str,
        i_key: &str,
        tags: HashMap<String, String>,
        time: DateTime<Utc>,
        base_type: &'static str,
        base_data: BaseData,
    ) -> Self {
        Self {
            name,
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            i_key: i_key.to_string(),
            tags,
            data: Data {
                base_type,
                base_data,
            },
        }
    }

    pub fn event(i_key: &str, tags: HashMap<String, String>, event: EventTelemetry) -> Self {
        Self::new(
            ENVELOPE_EVENT,
            i_key,
            tags,
            Utc::now(),
            "EventData",
            BaseData::Event(EventData {
                ver: DATA_VERSION,
                name: event.name,
                properties: event.properties,
            }),
        )
    }

    pub fn trace(i_key: &str, tags: HashMap<String, String>, trace: TraceTelemetry) -> Self {
        Self::new(
            ENVELOPE_MESSAGE,
            i_key,
            tags,
            Utc::now(),
            "MessageData",
            BaseData::Message(MessageData {
                ver: DATA_VERSION,
                message: trace.message,
                severity_level: trace.severity.as_u8(),
                properties: trace.properties,
            }),
        )
    }

    /// Request envelopes are stamped with the request's start time and carry
    /// the request id as the operation id.
    pub fn request(
        i_key: &str,
        mut tags: HashMap<String, String>,
        request: RequestTelemetry,
    ) -> Self {
        let started = Utc::now()
            - chrono::Duration::from_std(request.duration).unwrap_or_else(|_| chrono::Duration::zero());
        tags.insert(TAG_OPERATION_ID.to_string(), request.id.clone());
        tags.insert(TAG_OPERATION_NAME.to_string(), request.name.clone());

        Self::new(
            ENVELOPE_REQUEST,
            i_key,
            tags,
            started,
            "RequestData",
            BaseData::Request(RequestData {
                ver: DATA_VERSION,
                id: request.id,
                name: request.name,
                url: request.url,
                duration: format_duration(request.duration),
                response_code: request.response_code.to_string(),
                success: request.success,
            }),
        )
    }
}
