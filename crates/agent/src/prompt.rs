use chrono::NaiveDate;
use concierge_core::domain::activity::Activity;
use concierge_core::domain::room::Room;
use concierge_core::domain::spa::SpaService;
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

const PROMPT_TEMPLATE_NAME: &str = "concierge_prompt.txt";

const PROMPT_TEMPLATE: &str = r#"You are a helpful AI assistant for {{ resort_name }}. You help guests with:
- Room availability and booking inquiries
- Spa services and appointments
- Resort activities (water sports, yoga, excursions)
- Dining options and restaurant reservations
- General resort information and amenities
- Check-in/check-out procedures

Be friendly, professional, and concise. Use the data provided below to give accurate information. Keep responses under 4-5 sentences unless more detail is needed.

Today's date is {{ today }}. Never offer dates before today.
{% if rooms %}
Available Rooms:
{% for room in rooms %}- Room {{ room.number }} (id {{ room.id }}): {{ room.room_type }} - ${{ room.price }}/night (Capacity: {{ room.capacity }}) - {{ room.description }}
{% endfor %}{% endif %}{% if spa_services %}
Spa Services:
{% for service in spa_services %}- {{ service.name }} (id {{ service.id }}): {{ service.description }} - ${{ service.price }} ({{ service.duration_minutes }} min)
{% endfor %}{% endif %}{% if activities %}
Activities:
{% for activity in activities %}- {{ activity.name }}: {{ activity.description }} - ${{ activity.price }} ({{ activity.duration_minutes }} min) - {{ activity.schedule }}
{% endfor %}{% endif %}
When the guest wants to know whether something is free, end your reply with exactly one line:
CHECK_AVAILABILITY: {"type":"room","data":{"roomId":<room id>,"checkIn":"YYYY-MM-DD","checkOut":"YYYY-MM-DD"}}
or
CHECK_AVAILABILITY: {"type":"spa","data":{"serviceId":<service id>,"appointmentDate":"YYYY-MM-DD","appointmentTime":"HH:MM"}}

When the guest has confirmed a reservation and given their name, end your reply with exactly one line:
BOOKING_REQUEST: {"type":"room","data":{"roomId":<room id>,"guestName":"...","guestEmail":"...","guestPhone":"...","checkIn":"YYYY-MM-DD","checkOut":"YYYY-MM-DD","numGuests":1}}
or
BOOKING_REQUEST: {"type":"spa","data":{"serviceId":<service id>,"guestName":"...","guestEmail":"...","guestPhone":"...","appointmentDate":"YYYY-MM-DD","appointmentTime":"HH:MM"}}

Never include prices in these lines; the resort calculates them. Do not use either line for general questions.
{% if conversation %}
Recent conversation:
{{ conversation }}
{% endif %}
User: {{ message }}

Assistant:"#;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template is invalid: {0}")]
    Template(#[source] tera::Error),
    #[error("prompt rendering failed: {0}")]
    Render(#[source] tera::Error),
}

/// Catalogue sections a message asks about, by lowercase keyword match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Topics {
    pub rooms: bool,
    pub spa: bool,
    pub activities: bool,
}

impl Topics {
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));
        Self {
            rooms: mentions(&["room", "availab", "book"]),
            spa: mentions(&["spa", "massage", "treatment"]),
            activities: mentions(&["activit", "things to do", "sport"]),
        }
    }

    pub fn any(&self) -> bool {
        self.rooms || self.spa || self.activities
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogContext {
    pub rooms: Vec<Room>,
    pub spa_services: Vec<SpaService>,
    pub activities: Vec<Activity>,
}

pub struct PromptInput<'a> {
    pub resort_name: &'a str,
    pub today: NaiveDate,
    pub catalog: &'a CatalogContext,
    pub conversation: &'a str,
    pub message: &'a str,
}

#[derive(Serialize)]
struct RoomLine<'a> {
    id: i64,
    number: &'a str,
    room_type: &'a str,
    price: String,
    capacity: u32,
    description: &'a str,
}

#[derive(Serialize)]
struct ServiceLine<'a> {
    id: i64,
    name: &'a str,
    description: &'a str,
    price: String,
    duration_minutes: u32,
}

#[derive(Serialize)]
struct ActivityLine<'a> {
    name: &'a str,
    description: &'a str,
    price: String,
    duration_minutes: u32,
    schedule: &'a str,
}

pub struct PromptBuilder {
    tera: Tera,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_template(PROMPT_TEMPLATE_NAME, PROMPT_TEMPLATE)
            .map_err(PromptError::Template)?;
        Ok(Self { tera })
    }

    pub fn render(&self, input: &PromptInput<'_>) -> Result<String, PromptError> {
        let rooms: Vec<RoomLine<'_>> = input
            .catalog
            .rooms
            .iter()
            .map(|room| RoomLine {
                id: room.id.0,
                number: &room.room_number,
                room_type: &room.room_type,
                price: money(room.price_per_night),
                capacity: room.capacity,
                description: &room.description,
            })
            .collect();
        let spa_services: Vec<ServiceLine<'_>> = input
            .catalog
            .spa_services
            .iter()
            .map(|service| ServiceLine {
                id: service.id.0,
                name: &service.service_name,
                description: &service.description,
                price: money(service.price),
                duration_minutes: service.duration_minutes,
            })
            .collect();
        let activities: Vec<ActivityLine<'_>> = input
            .catalog
            .activities
            .iter()
            .map(|activity| ActivityLine {
                name: &activity.activity_name,
                description: &activity.description,
                price: money(activity.price),
                duration_minutes: activity.duration_minutes,
                schedule: &activity.schedule,
            })
            .collect();

        let mut context = Context::new();
        context.insert("resort_name", input.resort_name);
        context.insert("today", &input.today.format("%Y-%m-%d").to_string());
        context.insert("rooms", &rooms);
        context.insert("spa_services", &spa_services);
        context.insert("activities", &activities);
        context.insert("conversation", input.conversation.trim());
        context.insert("message", input.message.trim());

        self.tera.render(PROMPT_TEMPLATE_NAME, &context).map_err(PromptError::Render)
    }
}

fn money(amount: Decimal) -> String {
    amount.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use concierge_core::domain::room::{Room, RoomId};
    use rust_decimal::Decimal;

    use super::{CatalogContext, PromptBuilder, PromptInput, Topics};

    #[test]
    fn topics_follow_keywords() {
        let topics = Topics::detect("Is a ROOM available, and can I get a massage?");
        assert!(topics.rooms);
        assert!(topics.spa);
        assert!(!topics.activities);

        assert!(Topics::detect("What things to do are there?").activities);
        assert!(!Topics::detect("Where is the restaurant?").any());
    }

    #[test]
    fn prompt_includes_catalog_date_and_history() {
        let catalog = CatalogContext {
            rooms: vec![Room {
                id: RoomId(4),
                room_number: "201".to_string(),
                room_type: "Deluxe Ocean View".to_string(),
                description: "Balcony & lagoon".to_string(),
                price_per_night: Decimal::new(25_000, 2),
                capacity: 3,
                is_available: true,
                amenities: Vec::new(),
            }],
            ..CatalogContext::default()
        };

        let prompt = PromptBuilder::new()
            .expect("template")
            .render(&PromptInput {
                resort_name: "Paradise Resort & Spa",
                today: NaiveDate::from_ymd_opt(2026, 10, 17).expect("date"),
                catalog: &catalog,
                conversation: "User: hi\nAssistant: hello",
                message: "Book room 201 please",
            })
            .expect("render");

        assert!(prompt.starts_with("You are a helpful AI assistant for Paradise Resort & Spa."));
        assert!(prompt.contains("Today's date is 2026-10-17."));
        assert!(prompt.contains(
            "- Room 201 (id 4): Deluxe Ocean View - $250/night (Capacity: 3) - Balcony & lagoon"
        ));
        assert!(!prompt.contains("Spa Services:"));
        assert!(prompt.contains("Recent conversation:\nUser: hi\nAssistant: hello"));
        assert!(prompt.ends_with("User: Book room 201 please\n\nAssistant:"));
    }
}
