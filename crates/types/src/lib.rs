/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Number of digits in a national ABHA health-identity number.
pub const ABHA_NUMBER_LEN: usize = 14;

/// An Ayushman Bharat Health Account (ABHA) identifier.
///
/// Treated as an opaque token: it is echoed into callback URLs and handed to data sources, but
/// never checked against a registry. The only guarantee is that it is non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AbhaId(NonEmptyText);

impl AbhaId {
    /// Creates an `AbhaId` from caller-supplied text.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is blank.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    /// Parses an optional raw value, treating missing and blank input alike.
    pub fn from_optional(input: Option<&str>) -> Option<Self> {
        input.and_then(|raw| Self::new(raw).ok())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the identifier has the shape of a 14-digit ABHA number.
    pub fn is_abha_number(&self) -> bool {
        let s = self.as_str();
        s.len() == ABHA_NUMBER_LEN && s.bytes().all(|b| b.is_ascii_digit())
    }
}

impl std::fmt::Display for AbhaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for AbhaId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
