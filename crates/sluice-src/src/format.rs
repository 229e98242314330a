use std::fmt;

/// Unit in which segment positions and queries are expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    Undefined,
    /// Element-defined unit, e.g. samples.
    Default,
    #[default]
    Bytes,
    /// Nanoseconds.
    Time,
    Buffers,
    /// Fraction of [`PERCENT_MAX`].
    Percent,
}

/// Value representing 100% in [`Format::Percent`].
pub const PERCENT_MAX: u64 = 1_000_000;

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undefined => "undefined",
            Self::Default => "default",
            Self::Bytes => "bytes",
            Self::Time => "time",
            Self::Buffers => "buffers",
            Self::Percent => "percent",
        })
    }
}
