use std::fmt;

/// Continuation token handed out by the server after every successful request.
///
/// The server only looks at the token it was last shown, so a token can be
/// forked into any number of independent lineages. Tokens are passed by value
/// from a task to its children and never stored in shared state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parses a `Set-Cookie` style header, keeping only the `name=value` pair.
    pub fn from_header(value: &str) -> Option<Self> {
        let pair = value.split(';').next()?.trim();
        if pair.is_empty() {
            return None;
        }
        Some(Self(pair.to_string()))
    }

    /// Independent copy for a child branch.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
