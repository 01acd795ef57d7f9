//! Raw message parsing.
//!
//! Turns RFC 5322 bytes, as dropped into the spool by the mail collaborator, into an
//! [`IncomingMessage`]. MIME decoding is done by `mailparse`; dates go through
//! `dateparser` so the many `Date` spellings found on old lists are accepted.
//!
//! # Field handling
//!
//! - **Message-ID / In-Reply-To**: angle brackets and surrounding whitespace stripped
//! - **From**: split into lowercased address and optional display name
//! - **Date**: `None` when missing, unparseable or more than a day in the future.
//!   The ingestion pipeline rejects such messages as malformed.
//! - **Body**: first `text/plain` part, searched depth first, else the root body.
//!   Only NUL bytes are removed; indentation is significant for rendering.
//!
//! Parsing is CPU-bound and free of I/O, so callers run it on a rayon pool.

use chrono::{DateTime, Duration, Utc};
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};
use thiserror::Error;

use crate::models::IncomingMessage;

/// Maximum tolerated clock skew for future-dated emails.
const MAX_FUTURE_SKEW: Duration = Duration::hours(24);

/// Errors that can be returned while parsing an email.
#[derive(Debug, Error)]
pub enum ParseEmailError {
    #[error("failed to parse MIME structure: {0}")]
    MimeParse(#[from] mailparse::MailParseError),
    #[error("missing Message-ID header")]
    MissingMessageId,
    #[error("missing author email for message {message_id}")]
    MissingAuthorEmail { message_id: String },
}

/// Remove NUL bytes, which PostgreSQL cannot store in text columns.
fn sanitize_text(text: &str) -> String {
    text.replace('\0', "")
}

/// Strip angle brackets and whitespace from a message id header.
fn normalize_message_id(msg_id: Option<String>) -> Option<String> {
    msg_id.and_then(|id| {
        let cleaned = id.trim().trim_matches(&['<', '>'][..]).trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(sanitize_text(cleaned))
        }
    })
}

/// The first id of an `In-Reply-To` header. Some clients list several.
fn first_reference(header_value: Option<String>) -> Option<String> {
    let value = header_value?;
    let first = value.split_whitespace().next()?.to_string();
    normalize_message_id(Some(first))
}

fn parse_sender(from: &str) -> (String, Option<String>) {
    let Ok(addresses) = mailparse::addrparse(from) else {
        return (String::new(), None);
    };

    match addresses.iter().next() {
        Some(mailparse::MailAddr::Single(info)) => {
            let name = info
                .display_name
                .as_deref()
                .map(|name| sanitize_text(name).trim().to_string())
                .filter(|name| !name.is_empty());
            (info.addr.trim().to_lowercase(), name)
        }
        _ => (String::new(), None),
    }
}

fn find_text_part<'a>(part: &'a ParsedMail<'a>) -> Option<&'a ParsedMail<'a>> {
    if part.subparts.is_empty() {
        return (part.ctype.mimetype == "text/plain").then_some(part);
    }
    part.subparts.iter().find_map(find_text_part)
}

fn extract_body(parsed: &ParsedMail<'_>) -> String {
    let body = if parsed.subparts.is_empty() {
        parsed.get_body().unwrap_or_default()
    } else {
        find_text_part(parsed)
            .and_then(|part| part.get_body().ok())
            .unwrap_or_else(|| parsed.get_body().unwrap_or_default())
    };
    sanitize_text(&body)
}

fn parse_email_date(raw_date: Option<String>, message_id: &str) -> Option<DateTime<Utc>> {
    let raw = raw_date.unwrap_or_default();
    if raw.trim().is_empty() {
        log::warn!("email {} missing Date header", message_id);
        return None;
    }

    match dateparser::parse(raw.trim()) {
        Ok(dt) => {
            let utc = dt.with_timezone(&Utc);
            if utc > Utc::now() + MAX_FUTURE_SKEW {
                log::warn!(
                    "email {} has future date `{}` (> {} hours ahead)",
                    message_id,
                    raw,
                    MAX_FUTURE_SKEW.num_hours()
                );
                None
            } else {
                Some(utc)
            }
        }
        Err(source) => {
            log::warn!("email {} has invalid date `{}`: {}", message_id, raw, source);
            None
        }
    }
}

/// Parse raw email bytes into an inbound message.
pub fn parse_email(raw: &[u8]) -> Result<IncomingMessage, ParseEmailError> {
    let parsed = parse_mail(raw).map_err(|e| {
        log::debug!("failed to parse MIME: {}", e);
        ParseEmailError::MimeParse(e)
    })?;

    let id = normalize_message_id(parsed.headers.get_first_value("Message-ID"))
        .ok_or(ParseEmailError::MissingMessageId)?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .map(|s| sanitize_text(&s).trim().to_string())
        .unwrap_or_default();

    let from = parsed.headers.get_first_value("From").unwrap_or_default();
    let (sender_email, sender_name) = parse_sender(&from);
    if sender_email.is_empty() {
        log::warn!("email {} ({}) missing author email", id, subject);
        return Err(ParseEmailError::MissingAuthorEmail { message_id: id });
    }

    let date = parse_email_date(parsed.headers.get_first_value("Date"), &id);
    let in_reply_to = first_reference(parsed.headers.get_first_value("In-Reply-To"));
    let text_body = extract_body(&parsed);

    log::trace!("parsed: {} - {}", id, subject);

    Ok(IncomingMessage {
        id,
        subject,
        date,
        text_body,
        sender_email,
        sender_name,
        in_reply_to,
    })
}
