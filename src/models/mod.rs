pub mod event;
pub mod interval;
pub mod priority;
pub mod settings;
pub mod tag;
pub mod task;

/// Sentinel tag name meaning "no tag".
pub const NO_TAG: &str = "NoTag";
pub const NO_TITLE: &str = "(No title)";

pub(crate) fn normalize_tag_name(tag_name: Option<&str>) -> Option<String> {
    match tag_name.map(str::trim) {
        Some(name) if !name.is_empty() && name != NO_TAG => Some(name.to_string()),
        _ => None,
    }
}
