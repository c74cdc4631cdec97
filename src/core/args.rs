// Resolve the query text from positional and named call arguments.
use crate::core::error::{Error, ErrorKind};

/// Query text as a caller supplied it: positionally, by name, or both.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryArgs {
    pub positional: Option<String>,
    pub named: Option<String>,
}

impl QueryArgs {
    pub fn positional(query: impl Into<String>) -> Self {
        Self {
            positional: Some(query.into()),
            named: None,
        }
    }

    pub fn named(query: impl Into<String>) -> Self {
        Self {
            positional: None,
            named: Some(query.into()),
        }
    }

    /// Picks the single query the caller meant.
    ///
    /// Both forms must agree when both are present; a missing query is a
    /// usage error rather than a guess.
    pub fn resolve(&self) -> Result<&str, Error> {
        match (self.positional.as_deref(), self.named.as_deref()) {
            (Some(positional), Some(named)) if positional == named => Ok(named),
            (Some(_), Some(_)) => Err(Error::new(ErrorKind::Usage)
                .with_message("query given both positionally and by name with different text")
                .with_hint("Pass the query once, either as an argument or with --query.")),
            (Some(query), None) | (None, Some(query)) => Ok(query),
            (None, None) => Err(Error::new(ErrorKind::Usage)
                .with_message("no query argument")
                .with_hint("Pass the query as an argument or with --query.")),
        }
    }
}
