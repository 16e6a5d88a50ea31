//! # Permission Scopes
//!
//! The delegated Microsoft Graph permissions the bridge may request.
//!
//! Only three scopes are accepted. `Files.Read.All` and `Sites.Read.All`
//! gate the same SharePoint/OneDrive content and must be requested together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource prefix used when a scope is sent to the identity provider.
pub const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";

// =============================================================================
// SCOPE
// =============================================================================

/// A single accepted permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "ExternalItem.Read.All")]
    ExternalItemReadAll,
    #[serde(rename = "Files.Read.All")]
    FilesReadAll,
    #[serde(rename = "Sites.Read.All")]
    SitesReadAll,
}

impl Scope {
    /// All accepted scopes, in the order they are listed to users.
    pub const ALL: [Scope; 3] = [
        Scope::ExternalItemReadAll,
        Scope::FilesReadAll,
        Scope::SitesReadAll,
    ];

    /// The permission name as written on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExternalItemReadAll => "ExternalItem.Read.All",
            Self::FilesReadAll => "Files.Read.All",
            Self::SitesReadAll => "Sites.Read.All",
        }
    }

    /// The fully qualified scope as requested from the identity provider.
    #[must_use]
    pub fn graph_scope(self) -> String {
        format!("{GRAPH_RESOURCE}/{}", self.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| ScopeError::Invalid(s.to_string()))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a scope list is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("At least one scope must be provided.")]
    Empty,

    #[error("Invalid scope '{0}'. Accepted scopes are: {accepted}.", accepted = accepted_list())]
    Invalid(String),

    #[error("If using Sites.Read.All or Files.Read.All, both scopes must be specified.")]
    Unpaired,
}

fn accepted_list() -> String {
    Scope::ALL
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// SCOPE SET
// =============================================================================

/// A validated, de-duplicated set of scopes.
///
/// Construction goes through [`ScopeSet::parse`] or [`ScopeSet::from_scopes`],
/// so a `ScopeSet` is never empty and always satisfies the pairing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSet {
    scopes: BTreeSet<Scope>,
}

impl ScopeSet {
    /// Validate raw scope strings.
    ///
    /// Checks run in order: empty list, then the first unknown value,
    /// then the Files/Sites pairing rule.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, ScopeError> {
        if values.is_empty() {
            return Err(ScopeError::Empty);
        }
        let scopes = values
            .iter()
            .map(|v| v.as_ref().parse::<Scope>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_scopes(scopes)
    }

    /// Validate already-typed scopes.
    pub fn from_scopes<I: IntoIterator<Item = Scope>>(scopes: I) -> Result<Self, ScopeError> {
        let scopes: BTreeSet<Scope> = scopes.into_iter().collect();
        if scopes.is_empty() {
            return Err(ScopeError::Empty);
        }
        if scopes.contains(&Scope::FilesReadAll) != scopes.contains(&Scope::SitesReadAll) {
            return Err(ScopeError::Unpaired);
        }
        Ok(Self { scopes })
    }

    #[must_use]
    pub fn contains(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.scopes.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Graph-qualified scopes for a token request.
    #[must_use]
    pub fn graph_scopes(&self) -> Vec<String> {
        self.iter().map(Scope::graph_scope).collect()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Scope::as_str).collect();
        f.write_str(&names.join(" "))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_external_item() {
        let set = ScopeSet::parse(&["ExternalItem.Read.All"]).expect("valid");
        assert_eq!(set.len(), 1);
        assert!(set.contains(Scope::ExternalItemReadAll));
    }

    #[test]
    fn test_parse_all_three() {
        let set = ScopeSet::parse(&["Sites.Read.All", "ExternalItem.Read.All", "Files.Read.All"])
            .expect("valid");
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_parse_empty_list() {
        let empty: [&str; 0] = [];
        assert_eq!(ScopeSet::parse(&empty), Err(ScopeError::Empty));
    }

    #[test]
    fn test_parse_names_first_invalid() {
        let Err(err) = ScopeSet::parse(&["Mail.Read", "Calendars.Read"]) else {
            unreachable!("unknown scopes must be rejected");
        };
        assert_eq!(err, ScopeError::Invalid("Mail.Read".to_string()));
        assert_eq!(
            err.to_string(),
            "Invalid scope 'Mail.Read'. Accepted scopes are: \
             ExternalItem.Read.All, Files.Read.All, Sites.Read.All."
        );
    }

    #[test]
    fn test_unknown_scope_reported_before_pairing() {
        assert_eq!(
            ScopeSet::parse(&["Mail.Read", "Files.Read.All"]),
            Err(ScopeError::Invalid("Mail.Read".to_string()))
        );
    }

    #[test]
    fn test_parse_files_without_sites() {
        assert_eq!(
            ScopeSet::parse(&["Files.Read.All"]),
            Err(ScopeError::Unpaired)
        );
        assert_eq!(
            ScopeSet::parse(&["ExternalItem.Read.All", "Sites.Read.All"]),
            Err(ScopeError::Unpaired)
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = ScopeSet::parse(&["ExternalItem.Read.All", "ExternalItem.Read.All"])
            .expect("valid");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_scope_names_are_case_sensitive() {
        assert!("files.read.all".parse::<Scope>().is_err());
    }

    #[test]
    fn test_graph_scopes_are_qualified() {
        let set = ScopeSet::parse(&["Files.Read.All", "Sites.Read.All"]).expect("valid");
        assert_eq!(
            set.graph_scopes(),
            vec![
                "https://graph.microsoft.com/Files.Read.All".to_string(),
                "https://graph.microsoft.com/Sites.Read.All".to_string(),
            ]
        );
    }
}
