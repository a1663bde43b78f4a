use crate::directive::{Directive, DirectiveKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

/// Prices always come from the room tariff, so a directive carrying one is
/// denied under every policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub chat_bookings_enabled: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { chat_bookings_enabled: true }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, directive: &Directive) -> GuardrailDecision {
        if directive.mentions_price() {
            return GuardrailDecision::Deny {
                reason_code: "price_override_disallowed",
                user_message: "I can't set prices from chat. Rates are always calculated from \
                               our published tariff when the reservation is made."
                    .to_string(),
                fallback_path: "server_side_pricing",
            };
        }

        if directive.kind != DirectiveKind::BookingRequest {
            return GuardrailDecision::Allow;
        }

        if !self.chat_bookings_enabled {
            return GuardrailDecision::Degrade {
                reason_code: "chat_bookings_disabled",
                user_message: "I can't complete reservations in chat right now. Our front desk \
                               will be happy to finalise it for you."
                    .to_string(),
                fallback_path: "front_desk_handoff",
            };
        }

        if directive.guest_name().is_none() {
            return GuardrailDecision::Degrade {
                reason_code: "guest_name_missing",
                user_message: "To complete the reservation I just need the name it should be \
                               under."
                    .to_string(),
                fallback_path: "request_guest_details",
            };
        }

        GuardrailDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::domain::reservation::ReservationEnvelope;
    use serde_json::json;

    use super::{GuardrailDecision, GuardrailPolicy};
    use crate::directive::{Directive, DirectiveKind};

    fn directive(kind: DirectiveKind, data: serde_json::Value) -> Directive {
        Directive { kind, envelope: ReservationEnvelope { kind: "room".to_string(), data } }
    }

    fn reason_code(decision: &GuardrailDecision) -> Option<&'static str> {
        match decision {
            GuardrailDecision::Allow => None,
            GuardrailDecision::Deny { reason_code, .. }
            | GuardrailDecision::Degrade { reason_code, .. } => Some(reason_code),
        }
    }

    #[test]
    fn complete_booking_is_allowed() {
        let decision = GuardrailPolicy::default().evaluate(&directive(
            DirectiveKind::BookingRequest,
            json!({"roomId": 1, "guestName": "Ana"}),
        ));
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn price_in_directive_is_denied() {
        let decision = GuardrailPolicy::default().evaluate(&directive(
            DirectiveKind::CheckAvailability,
            json!({"roomId": 1, "pricePerNight": 10}),
        ));

        let (reason_code, user_message, fallback_path) = match decision {
            GuardrailDecision::Deny { reason_code, user_message, fallback_path } => {
                (reason_code, user_message, fallback_path)
            }
            _ => ("", String::new(), ""),
        };
        assert_eq!(reason_code, "price_override_disallowed");
        assert!(user_message.contains("can't set prices"));
        assert_eq!(fallback_path, "server_side_pricing");
    }

    #[test]
    fn disabled_bookings_degrade_but_checks_still_run() {
        let policy = GuardrailPolicy { chat_bookings_enabled: false };

        let booking = policy.evaluate(&directive(
            DirectiveKind::BookingRequest,
            json!({"roomId": 1, "guestName": "Ana"}),
        ));
        assert_eq!(reason_code(&booking), Some("chat_bookings_disabled"));

        let check = policy.evaluate(&directive(DirectiveKind::CheckAvailability, json!({"roomId": 1})));
        assert_eq!(check, GuardrailDecision::Allow);
    }

    #[test]
    fn anonymous_booking_asks_for_a_name() {
        let decision = GuardrailPolicy::default().evaluate(&directive(
            DirectiveKind::BookingRequest,
            json!({"roomId": 1, "guestName": "  "}),
        ));
        assert_eq!(reason_code(&decision), Some("guest_name_missing"));
    }

    #[test]
    fn price_carrying_booking_is_denied_under_every_policy() {
        for chat_bookings_enabled in [true, false] {
            let decision = GuardrailPolicy { chat_bookings_enabled }.evaluate(&directive(
                DirectiveKind::BookingRequest,
                json!({"roomId": 1, "guestName": "Ana", "totalPrice": 1}),
            ));
            assert!(
                matches!(decision, GuardrailDecision::Deny { reason_code: "price_override_disallowed", .. }),
                "bookings_enabled={chat_bookings_enabled}: {decision:?}"
            );
        }
    }
}
