//! Content derivation: subject state plus localized templates in, message
//! and event payloads out.

use chrono::{DateTime, Duration, Utc};

use crate::{
  destination::Destination,
  i18n::{EmbedTemplate, Messages, Variables},
  resource::{
    Embed, EmbedField, EmbedFooter, EmbedImage, EventContent, LinkButton,
    MessageContent,
  },
  subject::SubjectState,
};

pub const COLOR_ONLINE: u32 = 10_181_046;
pub const COLOR_OFFLINE: u32 = 9_807_270;

pub const FOOTER_ICON_URL: &str = "https://i.imgur.com/Qo9ZWge.png";

pub const STREAM_IMAGE_WIDTH: u32 = 1920;
pub const STREAM_IMAGE_HEIGHT: u32 = 1080;
pub const GAME_THUMBNAIL_WIDTH: u32 = 288;
pub const GAME_THUMBNAIL_HEIGHT: u32 = 384;

/// Lead time between creating an event and its advertised start.
pub const EVENT_START_DELAY: Duration = Duration::seconds(10);
/// Advertised end of a running event. The keep-alive tick pushes it forward
/// before it passes.
pub const EVENT_EXPIRY: Duration = Duration::minutes(2);

/// Everything a renderer needs for one (state, destination) pair.
#[derive(Debug, Clone, Copy)]
pub struct Render<'a> {
  pub state:    &'a SubjectState,
  pub dest:     &'a Destination,
  pub messages: &'a Messages,
  pub now:      DateTime<Utc>,
}

/// Placeholder values for `state`. Live-only values are empty when offline.
pub fn variables(state: &SubjectState) -> Variables {
  let vars = Variables::new().with("streamer", state.subject.login.as_str());
  match &state.live {
    Some(live) => vars
      .with("title", live.title.as_str())
      .with("game", live.game_name.as_str())
      .with("startedAt", format!("<t:{}:R>", live.started_at.timestamp())),
    None => vars.with("title", "").with("game", "").with("startedAt", ""),
  }
}

pub fn message_content(ctx: &Render<'_>) -> MessageContent {
  let vars = variables(ctx.state);
  let (template, color) = match ctx.state.live {
    Some(_) => (&ctx.messages.embed.online, COLOR_ONLINE),
    None => (&ctx.messages.embed.offline, COLOR_OFFLINE),
  };
  let live = ctx.state.live.as_ref();

  let image = live.map(|l| EmbedImage {
    url:    format!("{}?noCache{}", l.preview_url, ctx.now.timestamp()),
    width:  STREAM_IMAGE_WIDTH,
    height: STREAM_IMAGE_HEIGHT,
  });
  let thumbnail = live
    .and_then(|l| l.game_thumbnail_url.clone())
    .map(|url| EmbedImage {
      url,
      width: GAME_THUMBNAIL_WIDTH,
      height: GAME_THUMBNAIL_HEIGHT,
    });

  let content = if ctx.state.is_live() {
    ctx.dest.mention().prefix()
  } else {
    String::new()
  };

  let button = ctx
    .dest
    .message
    .buttons
    .then(|| button(template, &vars, ctx.state.subject.channel_url()));

  MessageContent {
    content,
    embed: Embed {
      title: non_empty(vars.format(&template.title)),
      description: non_empty(vars.format(&template.description)),
      url: ctx.state.subject.channel_url(),
      color,
      image,
      thumbnail,
      fields: fields(template, &vars),
      footer: non_empty(vars.format(&ctx.messages.embed.footer)).map(|text| EmbedFooter {
        text,
        icon_url: FOOTER_ICON_URL.to_owned(),
      }),
    },
    button,
  }
}

/// Event payload. `start_at` is only set when `creating`; a running event
/// keeps the start it was created with.
pub fn event_content(ctx: &Render<'_>, creating: bool) -> EventContent {
  let vars = variables(ctx.state);
  let templates = &ctx.messages.event;
  EventContent {
    name:        non_empty(vars.format(&templates.title)),
    description: non_empty(vars.format(&templates.description)),
    location:    ctx.state.subject.channel_url(),
    image:       ctx
      .state
      .live
      .as_ref()
      .and_then(|l| non_empty(l.preview_image.clone())),
    start_at:    creating.then(|| ctx.now + EVENT_START_DELAY),
    end_at:      ctx.now + EVENT_EXPIRY,
  }
}

/// `None` for the empty string.
pub fn non_empty(s: String) -> Option<String> {
  if s.is_empty() { None } else { Some(s) }
}

fn fields(template: &EmbedTemplate, vars: &Variables) -> Vec<EmbedField> {
  template
    .fields
    .iter()
    .filter_map(|field| {
      let value = non_empty(vars.format(&field.value))?;
      Some(EmbedField {
        name: vars.format(&field.name),
        value,
        inline: field.inline,
      })
    })
    .collect()
}

fn button(template: &EmbedTemplate, vars: &Variables, url: String) -> LinkButton {
  LinkButton {
    label: non_empty(vars.format(&template.button.label)),
    emoji: non_empty(vars.format(&template.button.emoji)),
    url,
  }
}
