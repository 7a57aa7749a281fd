//! Shared domain enums stored as lowercase text columns

use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres,
};
use utoipa::ToSchema;

/// Implements the sqlx text mapping for an enum exposing `as_str` and `FromStr`.
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patron,
    Librarian,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patron => "patron",
            Role::Librarian => "librarian",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    // Legacy rows may carry stray whitespace or capitals
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "patron" => Ok(Role::Patron),
            "librarian" => Ok(Role::Librarian),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

text_column!(Role);

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Collection visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Visibility::Private)
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(format!("Invalid visibility: {}", s)),
        }
    }
}

text_column!(Visibility);

// ---------------------------------------------------------------------------
// LoraStatus
// ---------------------------------------------------------------------------

/// Circulation status of a LoRA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoraStatus {
    #[default]
    CheckedIn,
    InCirculation,
    BeingRepaired,
}

impl LoraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoraStatus::CheckedIn => "checked_in",
            LoraStatus::InCirculation => "in_circulation",
            LoraStatus::BeingRepaired => "being_repaired",
        }
    }

    /// Only checked-in LoRAs can be requested or handed out
    pub fn is_borrowable(&self) -> bool {
        matches!(self, LoraStatus::CheckedIn)
    }
}

impl std::str::FromStr for LoraStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checked_in" => Ok(LoraStatus::CheckedIn),
            "in_circulation" => Ok(LoraStatus::InCirculation),
            "being_repaired" => Ok(LoraStatus::BeingRepaired),
            _ => Err(format!("Invalid LoRA status: {}", s)),
        }
    }
}

text_column!(LoraStatus);

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Status shared by access requests and borrow requests.
/// `Approved` and `Denied` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "denied" => Ok(RequestStatus::Denied),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

text_column!(RequestStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_tolerates_case_and_whitespace() {
        assert_eq!(" Librarian ".parse::<Role>(), Ok(Role::Librarian));
        assert_eq!("PATRON".parse::<Role>(), Ok(Role::Patron));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&LoraStatus::InCirculation).unwrap();
        assert_eq!(json, "\"in_circulation\"");
        let back: LoraStatus = serde_json::from_str("\"being_repaired\"").unwrap();
        assert_eq!(back, LoraStatus::BeingRepaired);
    }

    #[test]
    fn only_checked_in_is_borrowable() {
        assert!(LoraStatus::CheckedIn.is_borrowable());
        assert!(!LoraStatus::InCirculation.is_borrowable());
        assert!(!LoraStatus::BeingRepaired.is_borrowable());
    }

    #[test]
    fn as_str_round_trips_through_from_str() {
        for status in [RequestStatus::Pending, RequestStatus::Approved, RequestStatus::Denied] {
            assert_eq!(status.as_str().parse::<RequestStatus>(), Ok(status));
        }
        assert_eq!(Visibility::Private.to_string(), "private");
    }
}
