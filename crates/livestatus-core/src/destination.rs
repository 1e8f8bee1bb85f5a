//! Destinations: where notifications for a subject are delivered.

use serde::{Deserialize, Serialize};

use crate::{
  binding::{BindingKey, ResourceKind},
  subject::SubjectId,
};

/// Mention targets that address the whole group instead of a role.
pub const BROADCAST_MENTIONS: [&str; 2] = ["everyone", "here"];

/// Settings for the scheduled-event resource of a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
  pub active: bool,
}

/// Settings for the message resource of a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
  pub active:     bool,
  /// Attach a link button pointing at the channel page.
  pub buttons:    bool,
  pub channel_id: String,
  /// A role id, one of [`BROADCAST_MENTIONS`], or empty for no mention.
  pub mention:    String,
}

/// A configured notification target for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
  /// Notification group (guild) identifier.
  pub group_id:   String,
  pub subject_id: SubjectId,
  pub lang:       String,
  pub event:      EventSettings,
  pub message:    MessageSettings,
}

impl Destination {
  /// Whether resources of `kind` should be kept in sync for this destination.
  pub fn wants(&self, kind: ResourceKind) -> bool {
    match kind {
      ResourceKind::Message => {
        self.message.active && !self.message.channel_id.is_empty()
      }
      ResourceKind::Event => self.event.active,
    }
  }

  /// Registry key of the `kind` resource this destination owns for its
  /// subject. Events are channel-independent.
  pub fn binding_key(&self, kind: ResourceKind) -> BindingKey {
    let target_id = match kind {
      ResourceKind::Message => self.message.channel_id.clone(),
      ResourceKind::Event => String::new(),
    };
    BindingKey {
      kind,
      subject_id: self.subject_id.clone(),
      group_id: self.group_id.clone(),
      target_id,
    }
  }

  pub fn mention(&self) -> Mention { Mention::parse(&self.message.mention) }
}

/// Who a live notification pings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
  None,
  /// `@everyone` / `@here`.
  Broadcast(String),
  Role(String),
}

impl Mention {
  pub fn parse(target: &str) -> Self {
    if target.is_empty() {
      Mention::None
    } else if BROADCAST_MENTIONS.contains(&target) {
      Mention::Broadcast(target.to_owned())
    } else {
      Mention::Role(target.to_owned())
    }
  }

  /// Message content prefix for this mention.
  pub fn prefix(&self) -> String {
    match self {
      Mention::None => String::new(),
      Mention::Broadcast(keyword) => format!("@{keyword}"),
      Mention::Role(id) => format!("<@&{id}>"),
    }
  }
}
