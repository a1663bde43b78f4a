//! Structured directives the assistant appends to its reply.
//!
//! The model is told to finish with either `CHECK_AVAILABILITY: {...}` or
//! `BOOKING_REQUEST: {...}`. Only the first balanced JSON object after the
//! sentinel is parsed; anything following it stays in the guest-visible reply.

use concierge_core::domain::reservation::ReservationEnvelope;
use serde_json::Value;

pub const CHECK_AVAILABILITY_SENTINEL: &str = "CHECK_AVAILABILITY:";
pub const BOOKING_REQUEST_SENTINEL: &str = "BOOKING_REQUEST:";

const PRICE_KEYS: &[&str] =
    &["price", "totalPrice", "total_price", "pricePerNight", "price_per_night", "rate"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    CheckAvailability,
    BookingRequest,
}

impl DirectiveKind {
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::CheckAvailability => CHECK_AVAILABILITY_SENTINEL,
            Self::BookingRequest => BOOKING_REQUEST_SENTINEL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckAvailability => "check_availability",
            Self::BookingRequest => "booking_request",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub envelope: ReservationEnvelope,
}

impl Directive {
    /// True when the model tried to dictate a price inside the data block.
    pub fn mentions_price(&self) -> bool {
        self.envelope
            .data
            .as_object()
            .map(|data| PRICE_KEYS.iter().any(|key| data.contains_key(*key)))
            .unwrap_or(false)
    }

    pub fn guest_name(&self) -> Option<&str> {
        self.envelope
            .data
            .get("guestName")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveOutcome {
    Absent,
    Parsed(Directive),
    Malformed { kind: DirectiveKind, reason: String },
}

/// Model output split into the guest-facing text and the directive, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub reply: String,
    pub outcome: DirectiveOutcome,
}

pub fn extract(text: &str) -> Extraction {
    let Some((kind, sentinel_start)) = first_sentinel(text) else {
        return Extraction { reply: text.trim().to_string(), outcome: DirectiveOutcome::Absent };
    };

    let before = &text[..sentinel_start];
    let after_sentinel = sentinel_start + kind.sentinel().len();

    let Some(object_start) = text[after_sentinel..].find('{').map(|offset| after_sentinel + offset)
    else {
        return Extraction {
            reply: before.trim().to_string(),
            outcome: DirectiveOutcome::Malformed {
                kind,
                reason: "no JSON object after directive".to_string(),
            },
        };
    };

    let Some(object_end) = matching_brace(text, object_start) else {
        return Extraction {
            reply: before.trim().to_string(),
            outcome: DirectiveOutcome::Malformed {
                kind,
                reason: "unbalanced braces in directive".to_string(),
            },
        };
    };

    let reply = join_reply(before, &text[object_end..]);
    let outcome = match serde_json::from_str::<ReservationEnvelope>(&text[object_start..object_end])
    {
        Ok(envelope) => DirectiveOutcome::Parsed(Directive { kind, envelope }),
        Err(error) => DirectiveOutcome::Malformed { kind, reason: error.to_string() },
    };

    Extraction { reply, outcome }
}

fn first_sentinel(text: &str) -> Option<(DirectiveKind, usize)> {
    [DirectiveKind::CheckAvailability, DirectiveKind::BookingRequest]
        .into_iter()
        .filter_map(|kind| text.find(kind.sentinel()).map(|index| (kind, index)))
        .min_by_key(|(_, index)| *index)
}

/// Byte offset one past the `}` closing the object opened at `start`.
/// Braces inside JSON string literals are ignored.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

fn join_reply(before: &str, after: &str) -> String {
    let before = before.trim();
    let after = after.trim();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (_, true) => before.to_string(),
        _ => format!("{before}\n\n{after}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract, DirectiveKind, DirectiveOutcome};

    #[test]
    fn plain_reply_has_no_directive() {
        let extraction = extract("  We have three pools and a spa.  ");
        assert_eq!(extraction.reply, "We have three pools and a spa.");
        assert_eq!(extraction.outcome, DirectiveOutcome::Absent);
    }

    #[test]
    fn only_the_balanced_object_is_parsed() {
        let text = r#"Let me book that for you.
BOOKING_REQUEST: {"type":"room","data":{"roomId":1,"guestName":"Ana","checkIn":"2026-12-01","checkOut":"2026-12-03"}} trailing words"#;

        let extraction = extract(text);
        let DirectiveOutcome::Parsed(directive) = extraction.outcome else {
            panic!("expected a parsed directive");
        };

        assert_eq!(directive.kind, DirectiveKind::BookingRequest);
        assert_eq!(directive.envelope.kind, "room");
        assert_eq!(directive.envelope.data["roomId"], json!(1));
        assert_eq!(directive.guest_name(), Some("Ana"));
        assert_eq!(extraction.reply, "Let me book that for you.\n\ntrailing words");
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_object() {
        let text = r#"CHECK_AVAILABILITY: {"type":"spa","data":{"serviceId":"Massage {deluxe}","appointmentDate":"2026-12-01","appointmentTime":"10:00"}}"#;

        let DirectiveOutcome::Parsed(directive) = extract(text).outcome else {
            panic!("expected a parsed directive");
        };
        assert_eq!(directive.envelope.data["serviceId"], json!("Massage {deluxe}"));
    }

    #[test]
    fn unbalanced_object_is_malformed_and_stripped() {
        let extraction = extract(r#"Checking now. CHECK_AVAILABILITY: {"type":"room","data":{"roomId":1"#);

        assert_eq!(extraction.reply, "Checking now.");
        assert!(matches!(
            extraction.outcome,
            DirectiveOutcome::Malformed { kind: DirectiveKind::CheckAvailability, .. }
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let extraction = extract("Sure! BOOKING_REQUEST: {type: room}");
        assert_eq!(extraction.reply, "Sure!");
        assert!(matches!(extraction.outcome, DirectiveOutcome::Malformed { .. }));
    }

    #[test]
    fn price_fields_are_detected() {
        let text = r#"BOOKING_REQUEST: {"type":"room","data":{"roomId":2,"totalPrice":1}}"#;
        let DirectiveOutcome::Parsed(directive) = extract(text).outcome else {
            panic!("expected a parsed directive");
        };
        assert!(directive.mentions_price());
    }
}
