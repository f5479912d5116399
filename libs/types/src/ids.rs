//! Unique identifier types for platform entities
//!
//! User and book IDs use UUID v7 for time-sortable ordering, enabling
//! efficient chronological queries. Symbols and currencies are validated
//! string newtypes so malformed identifiers are rejected at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a user
///
/// Uses UUID v7 for time-based sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new UserId with current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a trading book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tenant of an exchange group: the unit of isolated portfolio/account
/// state. Either a user or a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "UPPERCASE")]
pub enum TenantId {
    User(UserId),
    Book(BookId),
}

impl TenantId {
    /// Short label for logging.
    pub fn kind_label(&self) -> &'static str {
        match self {
            TenantId::User(_) => "user",
            TenantId::Book(_) => "book",
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantId::User(id) => write!(f, "user:{}", id),
            TenantId::Book(id) => write!(f, "book:{}", id),
        }
    }
}

impl From<UserId> for TenantId {
    fn from(id: UserId) -> Self {
        TenantId::User(id)
    }
}

impl From<BookId> for TenantId {
    fn from(id: BookId) -> Self {
        TenantId::Book(id)
    }
}

/// Identifier of an exchange group (the set of tenants sharing one
/// market-data timeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Equity ticker symbol (e.g. "AAPL")
///
/// Uppercase ASCII, 1-12 characters, '.' and '-' allowed for share classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol
    ///
    /// # Panics
    /// Panics if the ticker is empty, too long, or not uppercase ASCII
    pub fn new(ticker: impl Into<String>) -> Self {
        let s = ticker.into();
        assert!(Self::is_valid(&s), "invalid ticker symbol: {:?}", s);
        Self(s)
    }

    /// Try to create a Symbol, returning None if invalid
    pub fn try_new(ticker: impl Into<String>) -> Option<Self> {
        let s = ticker.into();
        if Self::is_valid(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    fn is_valid(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= 12
            && s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
    }

    /// Get the ticker string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// ISO-4217 currency code (e.g. "USD")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    /// Create a new Currency
    ///
    /// # Panics
    /// Panics if the code is not exactly three uppercase ASCII letters
    pub fn new(code: &str) -> Self {
        Self::try_new(code).unwrap_or_else(|| panic!("invalid currency code: {:?}", code))
    }

    /// Try to create a Currency, returning None if invalid
    pub fn try_new(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() == 3 && bytes.iter().all(|b| b.is_ascii_uppercase()) {
            Some(Self([bytes[0], bytes[1], bytes[2]]))
        } else {
            None
        }
    }

    /// Get the code as a string slice
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII
        std::str::from_utf8(&self.0).unwrap()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Currency::try_new(&s).ok_or_else(|| format!("invalid currency code: {:?}", s))
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> String {
        c.as_str().to_string()
    }
}
