//! Typed ingestion inputs.
//!
//! Upstream collectors (mail sync, calendar sync, messaging bridges) hand
//! over JSON objects tagged by `kind`. Each converts into the `(text,
//! metadata)` pair that [`RetrievalPipeline::add_text`](crate::pipeline::RetrievalPipeline::add_text)
//! takes.
//!
//! ```json
//! {"kind": "social", "platform": "telegram", "content": "ship it?",
//!  "sender": "ops-bot", "timestamp": "2025-03-02T08:00:00Z", "is_bot_message": true}
//! ```
//!
//! Caller-supplied `metadata` is merged in first; the fields derived here
//! (including `source` and `user_id`) always win.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestMessage {
    Email(EmailMessage),
    CalendarEvent(CalendarEvent),
    Generic(GenericMessage),
    Social(SocialMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Free text from any other source; `source` becomes the stored source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericMessage {
    pub content: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// A chat or social-media message. Platform-specific fields live in [`Platform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMessage {
    pub content: String,
    #[serde(flatten)]
    pub platform: Platform,
    pub sender: String,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub chat_name: Option<String>,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_group_chat: bool,
    #[serde(default)]
    pub participants: Option<Vec<String>>,
    #[serde(default)]
    pub reply_to_message_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub urgency_level: Option<String>,
    #[serde(default)]
    pub contains_media: bool,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

fn default_message_type() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum Platform {
    WhatsApp {
        #[serde(default)]
        phone_number: Option<String>,
        #[serde(default)]
        contact_name: Option<String>,
    },
    Instagram {
        username: String,
        #[serde(default)]
        is_story_reply: bool,
        #[serde(default = "default_true")]
        is_direct_message: bool,
    },
    Telegram {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        chat_id: Option<String>,
        #[serde(default)]
        is_channel: bool,
        #[serde(default)]
        is_bot_message: bool,
    },
    /// Any other platform, named in `name` (e.g. `"twitter"`).
    Other { name: String },
}

impl Platform {
    pub fn name(&self) -> &str {
        match self {
            Self::WhatsApp { .. } => "whatsapp",
            Self::Instagram { .. } => "instagram",
            Self::Telegram { .. } => "telegram",
            Self::Other { name } => name,
        }
    }
}

impl IngestMessage {
    /// The source type this message is stored under.
    pub fn source(&self) -> &str {
        match self {
            Self::Email(_) => "email",
            Self::CalendarEvent(_) => "calendar",
            Self::Generic(m) => &m.source,
            Self::Social(_) => "social",
        }
    }

    /// Render to indexable text plus metadata owned by `user_id`.
    pub fn into_document(self, user_id: i64) -> (String, Metadata) {
        let source = self.source().to_string();
        let (text, extra, mut fields) = match self {
            Self::Email(m) => email_document(m),
            Self::CalendarEvent(e) => calendar_document(e),
            Self::Generic(g) => {
                let mut fields = Metadata::new();
                put(&mut fields, "timestamp", rfc3339(&g.timestamp));
                (g.content, g.metadata, fields)
            }
            Self::Social(s) => social_document(s),
        };

        let mut metadata = extra.unwrap_or_default();
        metadata.append(&mut fields);
        put(&mut metadata, "source", source);
        put(&mut metadata, "user_id", user_id);
        (text, metadata)
    }
}

type Rendered = (String, Option<Metadata>, Metadata);

fn email_document(m: EmailMessage) -> Rendered {
    let text = format!(
        "From: {}\nTo: {}\nSubject: {}\n\n{}",
        m.sender, m.recipient, m.subject, m.body
    );
    let mut fields = Metadata::new();
    put(&mut fields, "timestamp", rfc3339(&m.timestamp));
    put(&mut fields, "sender", m.sender);
    put(&mut fields, "recipient", m.recipient);
    put(&mut fields, "subject", m.subject);
    put_opt(&mut fields, "message_id", m.message_id);
    (text, m.metadata, fields)
}

fn calendar_document(e: CalendarEvent) -> Rendered {
    let mut text = format!(
        "Event: {}\nWhen: {} to {}",
        e.title,
        rfc3339(&e.start_time),
        rfc3339(&e.end_time)
    );
    if let Some(location) = &e.location {
        text.push_str(&format!("\nLocation: {}", location));
    }
    if let Some(attendees) = e.attendees.as_ref().filter(|a| !a.is_empty()) {
        text.push_str(&format!("\nAttendees: {}", attendees.join(", ")));
    }
    if let Some(description) = e.description.as_ref().filter(|d| !d.trim().is_empty()) {
        text.push_str(&format!("\n\n{}", description));
    }

    let mut fields = Metadata::new();
    put(&mut fields, "timestamp", rfc3339(&e.start_time));
    put(&mut fields, "title", e.title);
    put(&mut fields, "start_time", rfc3339(&e.start_time));
    put(&mut fields, "end_time", rfc3339(&e.end_time));
    put_opt(&mut fields, "location", e.location);
    if let Some(attendees) = e.attendees {
        put(&mut fields, "attendees", attendees);
    }
    put_opt(&mut fields, "event_id", e.event_id);
    (text, e.metadata, fields)
}

fn social_document(s: SocialMessage) -> Rendered {
    let platform = s.platform.name().to_string();
    let text = match &s.chat_name {
        Some(chat) => format!("[{}] {} in {}: {}", platform, s.sender, chat, s.content),
        None => format!("[{}] {}: {}", platform, s.sender, s.content),
    };

    let mut fields = Metadata::new();
    put(&mut fields, "timestamp", rfc3339(&s.timestamp));
    put(&mut fields, "platform", platform);
    put(&mut fields, "sender", s.sender);
    put_opt(&mut fields, "recipient", s.recipient);
    put_opt(&mut fields, "chat_name", s.chat_name);
    put(&mut fields, "message_type", s.message_type);
    put(&mut fields, "is_group_chat", s.is_group_chat);
    if let Some(participants) = s.participants {
        put(&mut fields, "participants", participants);
    }
    put_opt(&mut fields, "reply_to_message_id", s.reply_to_message_id);
    put_opt(&mut fields, "message_id", s.message_id);
    put_opt(&mut fields, "urgency_level", s.urgency_level);
    put(&mut fields, "contains_media", s.contains_media);

    match s.platform {
        Platform::WhatsApp {
            phone_number,
            contact_name,
        } => {
            put_opt(&mut fields, "phone_number", phone_number);
            put_opt(&mut fields, "contact_name", contact_name);
        }
        Platform::Instagram {
            username,
            is_story_reply,
            is_direct_message,
        } => {
            put(&mut fields, "username", username);
            put(&mut fields, "is_story_reply", is_story_reply);
            put(&mut fields, "is_direct_message", is_direct_message);
        }
        Platform::Telegram {
            username,
            chat_id,
            is_channel,
            is_bot_message,
        } => {
            put_opt(&mut fields, "username", username);
            put_opt(&mut fields, "chat_id", chat_id);
            put(&mut fields, "is_channel", is_channel);
            put(&mut fields, "is_bot_message", is_bot_message);
        }
        Platform::Other { .. } => {}
    }

    (text, s.metadata, fields)
}

fn put(metadata: &mut Metadata, key: &str, value: impl Into<Value>) {
    metadata.insert(key.to_string(), value.into());
}

fn put_opt(metadata: &mut Metadata, key: &str, value: Option<String>) {
    if let Some(v) = value {
        put(metadata, key, v);
    }
}

fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
