use crate::models::{EventRecord, RawEvent};

pub const UNTITLED_EVENT: &str = "Untitled Event";
pub const DEFAULT_CATEGORY: &str = "general";

/// Fill every missing or empty field of `raw` with its default. Present values
/// pass through verbatim; only the college fallback is title-cased.
pub fn normalize(raw: RawEvent, fallback_college: &str) -> EventRecord {
    EventRecord {
        title: present(raw.title).unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        college_name: present(raw.college_name).unwrap_or_else(|| title_case(fallback_college)),
        category: present(raw.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        date: present(raw.date),
        description: present(raw.description).unwrap_or_default(),
        link: present(raw.link).unwrap_or_default(),
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_cased = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if previous_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_cased = true;
        } else {
            out.push(ch);
            previous_cased = false;
        }
    }
    out
}
