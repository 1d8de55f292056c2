use indexmap::IndexMap;

pub const FONT_FAMILY: &str = "font-family";
pub const FONT_SIZE: &str = "font-size";
pub const COLOR: &str = "color";
pub const BACKGROUND_COLOR: &str = "background-color";

/// A set of CSS property writes. `None` removes the property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylePatch {
    entries: IndexMap<String, Option<String>>,
}

impl StylePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(property.into(), Some(value.into()));
        self
    }

    pub fn remove(mut self, property: impl Into<String>) -> Self {
        self.entries.insert(property.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Applies the patch to a declaration string, leaving every property the
    /// patch does not name untouched and in place.
    pub fn apply(&self, style: &str) -> String {
        let mut declarations = parse_style(style);
        for (property, value) in &self.entries {
            match value {
                Some(value) => {
                    declarations.insert(property.clone(), value.clone());
                }
                None => {
                    declarations.shift_remove(property);
                }
            }
        }
        write_style(&declarations)
    }
}

pub fn parse_style(style: &str) -> IndexMap<String, String> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some((property.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

pub fn write_style(declarations: &IndexMap<String, String>) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{property}: {value};"))
        .collect()
}

pub fn style_value(style: &str, property: &str) -> Option<String> {
    parse_style(style).get(property).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_malformed_declarations() {
        let parsed = parse_style("font-family: Arial; bogus ;color:#fff;:x;");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("font-family").map(String::as_str), Some("Arial"));
        assert_eq!(parsed.get("color").map(String::as_str), Some("#fff"));
    }

    #[test]
    fn patch_keeps_unrelated_properties_in_order() {
        let style = "color: red;font-size: 15px;";
        let patched = StylePatch::new()
            .set(FONT_FAMILY, "Georgia")
            .remove(COLOR)
            .apply(style);
        assert_eq!(patched, "font-size: 15px;font-family: Georgia;");
    }

    #[test]
    fn patch_overwrites_in_place() {
        let patched = StylePatch::new()
            .set(COLOR, "blue")
            .apply("color: red;font-size: 15px;");
        assert_eq!(patched, "color: blue;font-size: 15px;");
    }
}
