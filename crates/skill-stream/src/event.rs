use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator of the five recognized event categories.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SkillEventKind {
    #[serde(rename = "start")]
    Started,
    #[serde(rename = "log")]
    Log,
    #[serde(rename = "stream")]
    StreamChunk,
    #[serde(rename = "structured_data")]
    StructuredData,
    #[serde(rename = "end")]
    Ended,
}

impl SkillEventKind {
    /// Returns the discriminator value used on the wire.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Started => "start",
            Self::Log => "log",
            Self::StreamChunk => "stream",
            Self::StructuredData => "structured_data",
            Self::Ended => "end",
        }
    }
}

impl fmt::Display for SkillEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// Kind-specific data carried by a [`SkillEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum SkillPayload {
    /// A skill run began. `meta` is whatever descriptor the server attached.
    Started { meta: Option<serde_json::Value> },
    /// Free-form progress information.
    Log(serde_json::Value),
    /// Incremental output text.
    StreamChunk(String),
    /// Free-form structured result.
    StructuredData(serde_json::Value),
    /// A skill run finished. `summary` holds metadata such as token usage.
    Ended { summary: Option<serde_json::Value> },
}

/// One unit of server-pushed information about a running skill invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct SkillEvent {
    /// Result the event belongs to, when the server reports it.
    pub result_id: Option<String>,
    /// Skill step name, when the server reports it.
    pub step: Option<String>,
    pub payload: SkillPayload,
}

impl SkillEvent {
    pub fn new(payload: SkillPayload) -> Self {
        Self {
            result_id: None,
            step: None,
            payload,
        }
    }

    pub fn with_result_id(mut self, result_id: impl Into<String>) -> Self {
        self.result_id = Some(result_id.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn kind(&self) -> SkillEventKind {
        match self.payload {
            SkillPayload::Started { .. } => SkillEventKind::Started,
            SkillPayload::Log(_) => SkillEventKind::Log,
            SkillPayload::StreamChunk(_) => SkillEventKind::StreamChunk,
            SkillPayload::StructuredData(_) => SkillEventKind::StructuredData,
            SkillPayload::Ended { .. } => SkillEventKind::Ended,
        }
    }

    /// Returns the incremental text of a stream chunk.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            SkillPayload::StreamChunk(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    event: SkillEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step: Option<String>,
    #[serde(
        default,
        alias = "content",
        alias = "structuredData",
        skip_serializing_if = "Option::is_none"
    )]
    payload: Option<serde_json::Value>,
}

impl TryFrom<WireEvent> for SkillEvent {
    type Error = String;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let payload = match wire.event {
            SkillEventKind::Started => SkillPayload::Started { meta: wire.payload },
            SkillEventKind::Log => {
                SkillPayload::Log(wire.payload.unwrap_or(serde_json::Value::Null))
            }
            SkillEventKind::StreamChunk => match wire.payload {
                Some(serde_json::Value::String(text)) => SkillPayload::StreamChunk(text),
                _ => return Err("stream event without a text payload".to_string()),
            },
            SkillEventKind::StructuredData => {
                SkillPayload::StructuredData(wire.payload.unwrap_or(serde_json::Value::Null))
            }
            SkillEventKind::Ended => SkillPayload::Ended {
                summary: wire.payload,
            },
        };
        Ok(SkillEvent {
            result_id: wire.result_id,
            step: wire.step,
            payload,
        })
    }
}

impl From<SkillEvent> for WireEvent {
    fn from(event: SkillEvent) -> Self {
        let event_kind = event.kind();
        let payload = match event.payload {
            SkillPayload::Started { meta } => meta,
            SkillPayload::Log(value) | SkillPayload::StructuredData(value) => {
                Some(value).filter(|v| !v.is_null())
            }
            SkillPayload::StreamChunk(text) => Some(serde_json::Value::String(text)),
            SkillPayload::Ended { summary } => summary,
        };
        WireEvent {
            event: event_kind,
            result_id: event.result_id,
            step: event.step,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<SkillEvent, serde_json::Error> {
        serde_json::from_str(raw)
    }

    #[test]
    fn parses_each_recognized_kind() {
        let cases = [
            (r#"{"event":"start"}"#, SkillEventKind::Started),
            (r#"{"event":"log","payload":{"key":"searching"}}"#, SkillEventKind::Log),
            (r#"{"event":"stream","payload":"hel"}"#, SkillEventKind::StreamChunk),
            (
                r#"{"event":"structured_data","payload":{"sources":[]}}"#,
                SkillEventKind::StructuredData,
            ),
            (r#"{"event":"end"}"#, SkillEventKind::Ended),
        ];
        for (raw, kind) in cases {
            assert_eq!(parse(raw).expect(raw).kind(), kind, "{raw}");
        }
    }

    #[test]
    fn stream_chunk_accepts_content_alias_and_carries_ids() {
        let event = parse(r#"{"event":"stream","resultId":"r-1","step":"answer","content":"hi"}"#)
            .expect("parse");
        assert_eq!(event.text(), Some("hi"));
        assert_eq!(event.result_id.as_deref(), Some("r-1"));
        assert_eq!(event.step.as_deref(), Some("answer"));
    }

    #[test]
    fn stream_chunk_without_text_is_rejected() {
        assert!(parse(r#"{"event":"stream"}"#).is_err());
        assert!(parse(r#"{"event":"stream","payload":{"a":1}}"#).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(parse(r#"{"event":"heartbeat"}"#).is_err());
        assert!(parse(r#"{"payload":"no discriminator"}"#).is_err());
    }

    #[test]
    fn serializes_back_to_wire_names() {
        let event = SkillEvent::new(SkillPayload::StreamChunk("lo".into())).with_result_id("r-2");
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"event":"stream","resultId":"r-2","payload":"lo"})
        );
    }
}
