use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cosmetic admin-console preference, stored per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interface_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterfaceMode {
    Dark,
    Light,
}

impl InterfaceMode {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(InterfaceMode::Dark),
            "light" => Some(InterfaceMode::Light),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceMode::Dark => "dark",
            InterfaceMode::Light => "light",
        }
    }
}

/// An administrative staff account. `password_hash` never leaves the crate;
/// response DTOs are built per endpoint in the handlers.
#[derive(Debug, Clone, FromRow)]
pub struct Moderator {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub superuser: bool,
    pub mode: InterfaceMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_mode_parses_known_values_only() {
        assert_eq!(InterfaceMode::from_str("dark"), Some(InterfaceMode::Dark));
        assert_eq!(InterfaceMode::from_str("light"), Some(InterfaceMode::Light));
        assert_eq!(InterfaceMode::from_str("sepia"), None);
        assert_eq!(InterfaceMode::from_str("DARK"), None);
    }
}
