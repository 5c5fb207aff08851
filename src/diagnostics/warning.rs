use std::fmt;
use std::str::FromStr;

/// Warning kinds that can be suppressed by their public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Warning {
    /// Matches every warning.
    All,
    CursorMismatch,
    CannotCreateVerificationDatabase,
    RelationQueryWithoutTransaction,
    DuplicateResultColumns,
}

impl Warning {
    pub const ALL: [Warning; 5] = [
        Warning::All,
        Warning::CursorMismatch,
        Warning::CannotCreateVerificationDatabase,
        Warning::RelationQueryWithoutTransaction,
        Warning::DuplicateResultColumns,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Warning::All => "DAOC_ALL",
            Warning::CursorMismatch => "DAOC_CURSOR_MISMATCH",
            Warning::CannotCreateVerificationDatabase => "DAOC_CANNOT_CREATE_VERIFICATION_DATABASE",
            Warning::RelationQueryWithoutTransaction => "DAOC_RELATION_QUERY_WITHOUT_TRANSACTION",
            Warning::DuplicateResultColumns => "DAOC_DUPLICATE_RESULT_COLUMNS",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Warning {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Warning::ALL
            .iter()
            .copied()
            .find(|w| w.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown warning key `{s}`"))
    }
}
