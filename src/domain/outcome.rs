/// Result of offering one observation to an [`EventRecord`](super::EventRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Appended,
    Unchanged,
    TimestampCollision,
    Stale,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appended => "APPENDED",
            Self::Unchanged => "UNCHANGED",
            Self::TimestampCollision => "TIMESTAMP_COLLISION",
            Self::Stale => "STALE",
        }
    }

    pub fn is_append(&self) -> bool {
        matches!(self, Self::Appended)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
