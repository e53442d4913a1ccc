//! Message component tree, mirroring the Discord JSON shape.
//!
//! Only the fields the action subsystem reads or rewrites are modelled. Any
//! other key is kept in an `extra` map, and component kinds it does not know
//! about are kept verbatim as raw JSON, so a fetched tree re-serializes
//! unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discord component type of an action row.
pub const ACTION_ROW_TYPE: u8 = 1;
/// Discord component type of a button.
pub const BUTTON_TYPE: u8 = 2;
/// Discord component type of a string select menu.
pub const SELECT_MENU_TYPE: u8 = 3;
/// Button style of link buttons, which carry a URL instead of an identifier.
pub const LINK_BUTTON_STYLE: u8 = 5;

/// One row of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct ActionRow {
    /// Always [`ACTION_ROW_TYPE`]
    #[serde(rename = "type", default = "action_row_type")]
    #[new(value = "ACTION_ROW_TYPE")]
    pub kind: u8,
    /// Components in display order
    #[serde(default)]
    pub components: Vec<Component>,
    /// Fields not modelled above, such as `id`
    #[serde(flatten)]
    #[new(default)]
    pub extra: Map<String, Value>,
}

fn action_row_type() -> u8 {
    ACTION_ROW_TYPE
}

/// A component inside an [`ActionRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Component {
    /// Button (type 2)
    Button(Button),
    /// String select menu (type 3)
    SelectMenu(SelectMenu),
    /// Any other component, preserved as-is
    Other(Value),
}

impl Component {
    /// The identifier Discord reports when the component is used, if any.
    pub fn custom_id(&self) -> Option<&str> {
        match self {
            Self::Button(button) => button.custom_id.as_deref(),
            Self::SelectMenu(menu) => Some(menu.custom_id.as_str()),
            Self::Other(raw) => raw.get("custom_id").and_then(Value::as_str),
        }
    }
}

/// Button component.
///
/// `kind` is checked on deserialization so that other component types with a
/// `style` field never parse as buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    /// Always [`BUTTON_TYPE`]
    #[serde(rename = "type", deserialize_with = "expect_button")]
    pub kind: u8,
    /// Discord button style (1..=5)
    pub style: u8,
    /// Button text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Partial emoji object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Value>,
    /// Component identifier; absent on link buttons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Target of link buttons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Greyed out
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    /// Fields not modelled above, such as `id` or `sku_id`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Button {
    /// Button that runs the action set behind `custom_id`.
    pub fn action(style: u8, label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self {
            kind: BUTTON_TYPE,
            style,
            label: Some(label.into()),
            emoji: None,
            custom_id: Some(custom_id.into()),
            url: None,
            disabled: false,
            extra: Map::new(),
        }
    }

    /// Link button opening `url`.
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: BUTTON_TYPE,
            style: LINK_BUTTON_STYLE,
            label: Some(label.into()),
            emoji: None,
            custom_id: None,
            url: Some(url.into()),
            disabled: false,
            extra: Map::new(),
        }
    }

    /// Whether this is a link button.
    pub fn is_link(&self) -> bool {
        self.style == LINK_BUTTON_STYLE
    }
}

/// String select menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectMenu {
    /// Always [`SELECT_MENU_TYPE`]
    #[serde(rename = "type", deserialize_with = "expect_select_menu")]
    pub kind: u8,
    /// Menu identifier
    pub custom_id: String,
    /// Text shown when nothing is selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Minimum number of selections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u8>,
    /// Maximum number of selections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_values: Option<u8>,
    /// Choices
    pub options: Vec<SelectMenuOption>,
    /// Greyed out
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    /// Fields not modelled above, such as `id`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SelectMenu {
    /// Menu with the given identifier and options.
    pub fn new(custom_id: impl Into<String>, options: Vec<SelectMenuOption>) -> Self {
        Self {
            kind: SELECT_MENU_TYPE,
            custom_id: custom_id.into(),
            placeholder: None,
            min_values: None,
            max_values: None,
            options,
            disabled: false,
            extra: Map::new(),
        }
    }
}

/// Choice of a [`SelectMenu`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectMenuOption {
    /// Text shown to the user
    pub label: String,
    /// Value reported on selection; carries an action-set identifier
    pub value: String,
    /// Secondary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Partial emoji object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Value>,
    /// Selected by default
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SelectMenuOption {
    /// Option with a label and value.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            emoji: None,
            default: false,
            extra: Map::new(),
        }
    }
}

/// Replace every occurrence of identifier `from` with `to`, in button ids,
/// menu ids and option values. Returns whether anything changed.
pub fn rewrite_identifier(rows: &mut [ActionRow], from: &str, to: &str) -> bool {
    let mut changed = false;
    for component in rows.iter_mut().flat_map(|row| row.components.iter_mut()) {
        match component {
            Component::Button(button) => {
                if button.custom_id.as_deref() == Some(from) {
                    button.custom_id = Some(to.to_string());
                    changed = true;
                }
            }
            Component::SelectMenu(menu) => {
                if menu.custom_id == from {
                    menu.custom_id = to.to_string();
                    changed = true;
                }
                for option in menu.options.iter_mut().filter(|o| o.value == from) {
                    option.value = to.to_string();
                    changed = true;
                }
            }
            Component::Other(_) => {}
        }
    }
    changed
}

fn expect_type<'de, D: serde::Deserializer<'de>>(deserializer: D, want: u8) -> Result<u8, D::Error> {
    let kind = u8::deserialize(deserializer)?;
    if kind == want {
        Ok(kind)
    } else {
        Err(serde::de::Error::custom(format!(
            "component type {kind}, expected {want}"
        )))
    }
}

fn expect_button<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    expect_type(deserializer, BUTTON_TYPE)
}

fn expect_select_menu<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    expect_type(deserializer, SELECT_MENU_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_mixed_row() {
        let row: ActionRow = serde_json::from_value(json!({
            "type": 1,
            "components": [
                {"type": 2, "style": 1, "label": "Join", "custom_id": "act1:join"},
                {"type": 2, "style": 5, "label": "Docs", "url": "https://example.com"},
                {"type": 3, "custom_id": "act1:menu", "options": [
                    {"label": "Red", "value": "act1:red"}
                ]},
                {"type": 8, "custom_id": "x", "channel_types": [0]}
            ]
        }))
        .unwrap();

        assert_eq!(row.components.len(), 4);
        assert!(matches!(&row.components[0], Component::Button(b) if !b.is_link()));
        assert!(matches!(&row.components[1], Component::Button(b) if b.is_link()));
        assert!(matches!(&row.components[2], Component::SelectMenu(m) if m.options.len() == 1));
        assert!(matches!(&row.components[3], Component::Other(_)));
        assert_eq!(row.components[3].custom_id(), Some("x"));
        assert_eq!(row.components[1].custom_id(), None);
    }

    #[test]
    fn test_unknown_component_kept_verbatim() {
        let raw = json!({"type": 4, "custom_id": "modal", "style": 1, "label": "x"});
        let component: Component = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(component, Component::Other(_)));
        assert_eq!(serde_json::to_value(&component).unwrap(), raw);
    }

    #[test]
    fn test_unmodelled_fields_survive_round_trip() {
        let raw = json!([{
            "type": 1,
            "id": 1,
            "components": [
                {"type": 2, "style": 6, "sku_id": "123456789", "id": 7},
                {"type": 2, "style": 1, "label": "Foreign", "custom_id": "ticket:open", "id": 8},
                {"type": 3, "custom_id": "act1:menu", "id": 9, "options": [
                    {"label": "Red", "value": "act1:red", "hint": true}
                ]}
            ]
        }]);
        let rows: Vec<ActionRow> = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(&rows[0].components[0], Component::Button(b) if b.extra["sku_id"] == "123456789"));
        assert_eq!(serde_json::to_value(&rows).unwrap(), raw);
    }

    #[test]
    fn test_rewrite_keeps_unmodelled_fields() {
        let mut rows: Vec<ActionRow> = serde_json::from_value(json!([{
            "type": 1,
            "components": [
                {"type": 2, "style": 1, "custom_id": "act1:gift:01", "id": 3},
                {"type": 2, "style": 6, "sku_id": "42"}
            ]
        }]))
        .unwrap();

        assert!(rewrite_identifier(&mut rows, "act1:gift:01", "act1:gift:03"));
        assert_eq!(
            serde_json::to_value(&rows).unwrap(),
            json!([{
                "type": 1,
                "components": [
                    {"type": 2, "style": 1, "custom_id": "act1:gift:03", "id": 3},
                    {"type": 2, "style": 6, "sku_id": "42"}
                ]
            }])
        );
    }

    #[test]
    fn test_button_serialization_omits_empty_fields() {
        let value = serde_json::to_value(Button::link("Docs", "https://example.com")).unwrap();
        assert_eq!(
            value,
            json!({"type": 2, "style": 5, "label": "Docs", "url": "https://example.com"})
        );
    }

    #[test]
    fn test_rewrite_identifier_touches_only_matches() {
        let mut rows = vec![ActionRow::new(vec![
            Component::Button(Button::action(1, "Claim", "act1:gift:01")),
            Component::Button(Button::action(1, "Other", "act1:other")),
            Component::SelectMenu(SelectMenu::new(
                "act1:menu",
                vec![SelectMenuOption::new("Gift", "act1:gift:01")],
            )),
        ])];

        assert!(rewrite_identifier(&mut rows, "act1:gift:01", "act1:gift:03"));
        assert_eq!(rows[0].components[0].custom_id(), Some("act1:gift:03"));
        assert_eq!(rows[0].components[1].custom_id(), Some("act1:other"));
        let Component::SelectMenu(menu) = &rows[0].components[2] else {
            panic!("expected select menu");
        };
        assert_eq!(menu.options[0].value, "act1:gift:03");
        assert!(!rewrite_identifier(&mut rows, "act1:missing", "act1:x"));
    }
}
