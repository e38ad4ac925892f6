// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Filename templates.
//!
//! A template is literal text with `{context.field}` placeholders, where a
//! date-valued field may carry a strftime format after a colon:
//!
//! ```text
//! {episode.date:%Y-%m-%d}-{item.title}.mp3
//! ```
//!
//! `{{` and `}}` produce literal braces. Rendering never sanitizes; use
//! [`sanitize_path_component`] before touching the filesystem.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset};
use tracing::warn;

use crate::error::TemplateError;
use crate::feed::FeedItem;
use crate::model::{Episode, Podcast};

/// The three things a filename template can refer to
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub item: &'a FeedItem,
    pub episode: &'a Episode,
    pub podcast: &'a Podcast,
}

#[derive(Debug, PartialEq)]
enum Segment<'t> {
    Literal(String),
    Placeholder {
        reference: &'t str,
        format: Option<&'t str>,
    },
}

enum Value<'a> {
    Text(&'a str),
    Date(DateTime<FixedOffset>),
}

/// Check if a character may appear in a path component as-is
fn is_valid_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `-`
pub fn sanitize_path_component(name: &str) -> String {
    name.chars()
        .map(|c| if is_valid_filename_char(c) { c } else { '-' })
        .collect()
}

/// Render a filename, degrading to whatever was rendered before a failure.
///
/// Failures are logged, never propagated: a broken template must not stop
/// an episode from being tracked.
pub fn format_filename(template: &str, context: &TemplateContext<'_>) -> String {
    match render_template(template, context) {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!(
                "filename template failed for episode {} of '{}': {}",
                context.episode.guid, context.podcast.label, e
            );
            e.partial().to_string()
        }
    }
}

/// Render a template against an item, episode and podcast
pub fn render_template(template: &str, context: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let segments = parse_template(template)?;
    let mut out = String::with_capacity(template.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Placeholder { reference, format } => {
                render_placeholder(&mut out, reference, format, context)?;
            }
        }
    }

    Ok(out)
}

fn parse_template(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let start = position + 1;
                let end = template[start..]
                    .find('}')
                    .map(|offset| start + offset)
                    .ok_or(TemplateError::Unclosed { position })?;

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }

                let inner = &template[start..end];
                let (reference, format) = match inner.split_once(':') {
                    Some((reference, format)) => (reference.trim(), Some(format)),
                    None => (inner.trim(), None),
                };
                segments.push(Segment::Placeholder { reference, format });

                // Skip to just past the closing brace
                while chars.next_if(|&(i, _)| i <= end).is_some() {}
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(TemplateError::UnmatchedBrace { position }),
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn render_placeholder(
    out: &mut String,
    reference: &str,
    format: Option<&str>,
    context: &TemplateContext<'_>,
) -> Result<(), TemplateError> {
    let value = resolve(reference, context).map_err(|e| with_partial(e, out.as_str()))?;

    match (value, format) {
        (Value::Text(text), None) => out.push_str(text),
        (Value::Text(_), Some(_)) => {
            return Err(TemplateError::NotADate {
                reference: reference.to_string(),
                partial: out.clone(),
            });
        }
        (Value::Date(date), None) => out.push_str(&date.to_rfc3339()),
        (Value::Date(date), Some(format)) => {
            let mark = out.len();
            if write!(out, "{}", date.format(format)).is_err() {
                out.truncate(mark);
                return Err(TemplateError::InvalidDateFormat {
                    format: format.to_string(),
                    partial: out.clone(),
                });
            }
        }
    }

    Ok(())
}

fn with_partial(error: TemplateError, out: &str) -> TemplateError {
    match error {
        TemplateError::UnknownContext { name, .. } => TemplateError::UnknownContext {
            name,
            partial: out.to_string(),
        },
        TemplateError::UnknownField { context, field, .. } => TemplateError::UnknownField {
            context,
            field,
            partial: out.to_string(),
        },
        other => other,
    }
}

fn resolve<'a>(reference: &str, context: &TemplateContext<'a>) -> Result<Value<'a>, TemplateError> {
    let (scope, field) = reference.split_once('.').unwrap_or((reference, ""));
    let unknown_field = || TemplateError::UnknownField {
        context: scope.to_string(),
        field: field.to_string(),
        partial: String::new(),
    };

    let text = |value: &'a Option<String>| Value::Text(value.as_deref().unwrap_or(""));

    match scope {
        "item" => {
            let item = context.item;
            match field {
                "title" => Ok(Value::Text(&item.title)),
                "guid" => Ok(Value::Text(&item.guid)),
                "link" => Ok(text(&item.link)),
                "description" => Ok(text(&item.description)),
                "author" => Ok(text(&item.author)),
                "url" => Ok(text(&item.enclosure_url)),
                "published" => Ok(Value::Date(item.published)),
                _ => Err(unknown_field()),
            }
        }
        "episode" => {
            let episode = context.episode;
            match field {
                "guid" => Ok(Value::Text(&episode.guid)),
                "title" => Ok(Value::Text(&episode.title)),
                "url" => Ok(text(&episode.url)),
                "date" => Ok(Value::Date(episode.date)),
                _ => Err(unknown_field()),
            }
        }
        "podcast" => {
            let podcast = context.podcast;
            match field {
                "label" => Ok(Value::Text(&podcast.label)),
                "title" => Ok(Value::Text(&podcast.title)),
                "feed" => Ok(Value::Text(&podcast.feed)),
                "directory" => Ok(Value::Text(podcast.directory.to_str().unwrap_or(""))),
                _ => Err(unknown_field()),
            }
        }
        _ => Err(TemplateError::UnknownContext {
            name: scope.to_string(),
            partial: String::new(),
        }),
    }
}
