use std::fmt;

/// Media types a pad can produce or accept.
///
/// Negotiation only needs set semantics here: a list of media type names in
/// preference order, or `Any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caps {
    Any,
    List(Vec<String>),
}

impl Caps {
    /// Caps matching nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::List(Vec::new())
    }

    #[must_use]
    pub fn new<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(media_types.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::List(types) if types.is_empty())
    }

    /// Exactly one media type.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::List(types) if types.len() == 1)
    }

    /// Common media types, in `self`'s preference order.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, caps) | (caps, Self::Any) => caps.clone(),
            (Self::List(ours), Self::List(theirs)) => Self::List(
                ours.iter()
                    .filter(|t| theirs.contains(t))
                    .cloned()
                    .collect(),
            ),
        }
    }

    /// Keep only the preferred media type.
    #[must_use]
    pub fn fixate(self) -> Self {
        match self {
            Self::Any => Self::Any,
            Self::List(mut types) => {
                types.truncate(1);
                Self::List(types)
            }
        }
    }

    #[must_use]
    pub fn media_types(&self) -> &[String] {
        match self {
            Self::Any => &[],
            Self::List(types) => types,
        }
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("ANY"),
            Self::List(types) if types.is_empty() => f.write_str("EMPTY"),
            Self::List(types) => f.write_str(&types.join("; ")),
        }
    }
}
