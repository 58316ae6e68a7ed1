use once_cell::sync::Lazy;
use serde_json::{json, Value};

// The descriptions steer what the extractor returns.
const FIELDS: [(&str, &str); 6] = [
    ("title", "The name of the fest or workshop"),
    (
        "college_name",
        "The college hosting the event (e.g., CBIT, MGIT)",
    ),
    (
        "category",
        "The category of the event (e.g., technical, cultural, workshop)",
    ),
    (
        "date",
        "Event date in any format (e.g., 'Feb 17', '2024-02-17', '17th February')",
    ),
    ("description", "A brief summary of the event"),
    ("link", "The registration or info URL"),
];

pub const EXTRACT_INSTRUCTION: &str = "Find all upcoming technical and cultural fests, workshops, and events. \
Extract title, category, date (in any format), description, and registration link. \
Look for dynamic content that may load with JavaScript.";

pub static EVENT_SCHEMA: Lazy<Value> = Lazy::new(event_list_schema);

pub fn event_schema() -> Value {
    let properties: serde_json::Map<String, Value> = FIELDS
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "string", "description": description }),
            )
        })
        .collect();
    json!({
        "type": "object",
        "title": "EventSchema",
        "properties": properties,
        "required": FIELDS.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
    })
}

fn event_list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "events": { "type": "array", "items": event_schema() }
        },
        "required": ["events"],
    })
}

pub fn search_query(college: &str) -> String {
    format!("{college} events page")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_carries_every_field_with_guidance() {
        let schema = event_schema();
        let properties = schema["properties"].as_object().expect("properties");
        assert_eq!(properties.len(), 6);
        for (name, description) in FIELDS {
            assert_eq!(properties[name]["description"], description);
        }
        assert_eq!(EVENT_SCHEMA["properties"]["events"]["items"], schema);
    }

    #[test]
    fn search_query_appends_events_page() {
        assert_eq!(search_query("CBIT"), "CBIT events page");
    }
}
