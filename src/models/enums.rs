use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid enum value for {field}: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(DocumentStatus {
    Processing => "processing",
    Processed => "processed",
    Error => "error",
});

str_enum!(Role {
    Admin => "admin",
    Analyst => "analyst",
    Viewer => "viewer",
});

str_enum!(Decision {
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(FieldType {
    Age => "age",
    Gender => "gender",
    Procedure => "procedure",
    Location => "location",
    PolicyDuration => "policy_duration",
});

str_enum!(NotificationLevel {
    Success => "success",
    Info => "info",
    Warning => "warning",
    Error => "error",
});

impl Role {
    /// Upload, edit, delete and clean up documents.
    pub fn can_manage_documents(&self) -> bool {
        matches!(self, Self::Admin | Self::Analyst)
    }

    pub fn can_manage_settings(&self) -> bool {
        matches!(self, Self::Admin)
    }
}
