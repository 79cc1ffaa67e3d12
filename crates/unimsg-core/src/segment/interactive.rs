use serde::{Deserialize, Serialize};

use super::Origin;

/// What happens when a [`Button`] is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonFlag {
    /// Opens `url`.
    Link,
    /// Sends a callback carrying `id`.
    #[default]
    Action,
    /// Fills `text` into the input box.
    Input,
    /// Sends `text` right away.
    Enter,
}

/// Who may press a [`Button`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", content = "ids", rename_all = "snake_case")]
pub enum Permission {
    #[default]
    All,
    Admin,
    Users(Vec<String>),
    Roles(Vec<String>),
}

/// An interactive button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(default)]
    pub flag: ButtonFlag,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicked_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub permission: Permission,
    #[serde(skip)]
    pub origin: Origin,
}

impl Button {
    fn base(flag: ButtonFlag, label: impl Into<String>) -> Self {
        Self {
            flag,
            label: label.into(),
            clicked_label: None,
            id: None,
            url: None,
            text: None,
            permission: Permission::All,
            origin: Origin::none(),
        }
    }

    pub fn action(label: impl Into<String>) -> Self {
        Self::base(ButtonFlag::Action, label)
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::base(ButtonFlag::Link, label)
        }
    }

    pub fn input(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::base(ButtonFlag::Input, label)
        }
    }

    pub fn enter(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::base(ButtonFlag::Enter, label)
        }
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }
}

/// A group of buttons laid out in rows of at most `row_width`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_width: Option<usize>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Keyboard {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self {
            id: None,
            buttons,
            row_width: None,
            origin: Origin::none(),
        }
    }

    /// Buttons grouped into rows.
    pub fn rows(&self) -> Vec<&[Button]> {
        match self.row_width {
            Some(width) if width > 0 => self.buttons.chunks(width).collect(),
            _ => vec![self.buttons.as_slice()],
        }
    }
}
