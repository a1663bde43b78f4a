use serde::{Deserialize, Serialize};

/// Recent chat history as posted by the widget: either the pre-rendered
/// `User: ...` / `Assistant: ...` transcript or a list of turns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationContext {
    Transcript(String),
    Turns(Vec<ConversationTurn>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    #[serde(alias = "text")]
    pub content: String,
}

impl ConversationTurn {
    fn speaker(&self) -> &'static str {
        match self.role.trim().to_ascii_lowercase().as_str() {
            "user" | "guest" => "User",
            _ => "Assistant",
        }
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::Transcript(String::new())
    }
}

impl ConversationContext {
    /// The last `max_lines` non-blank transcript lines, oldest first.
    pub fn trailing(&self, max_lines: usize) -> String {
        let lines: Vec<String> = match self {
            Self::Transcript(text) => text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Self::Turns(turns) => turns
                .iter()
                .filter(|turn| !turn.content.trim().is_empty())
                .map(|turn| format!("{}: {}", turn.speaker(), turn.content.trim()))
                .collect(),
        };

        let skip = lines.len().saturating_sub(max_lines);
        lines[skip..].join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationContext, ConversationTurn};

    #[test]
    fn transcript_keeps_only_the_tail() {
        let transcript = (1..=9).map(|n| format!("User: message {n}")).collect::<Vec<_>>().join("\n");
        let context = ConversationContext::Transcript(transcript);

        let trailing = context.trailing(6);
        assert_eq!(trailing.lines().count(), 6);
        assert!(trailing.starts_with("User: message 4"));
        assert!(trailing.ends_with("User: message 9"));
    }

    #[test]
    fn turns_are_rendered_with_speakers() {
        let context = ConversationContext::Turns(vec![
            ConversationTurn { role: "user".to_string(), content: "Any rooms?".to_string() },
            ConversationTurn { role: "bot".to_string(), content: "Yes, several.".to_string() },
        ]);

        assert_eq!(context.trailing(6), "User: Any rooms?\nAssistant: Yes, several.");
    }

    #[test]
    fn widget_payload_decodes_either_shape() {
        let text: ConversationContext =
            serde_json::from_str(r#""User: hi\nAssistant: hello""#).expect("transcript");
        assert_eq!(text.trailing(1), "Assistant: hello");

        let turns: ConversationContext =
            serde_json::from_str(r#"[{"role": "user", "text": "hi"}]"#).expect("turns");
        assert_eq!(turns.trailing(6), "User: hi");
    }
}
