//! Identity directory: the authoritative "is this a registered principal" lookup.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;

use crate::cache::normalize_identity;
use crate::error::Result;

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// `identity` arrives trimmed and lowercased.
    async fn exists_by_identity(&self, identity: &str) -> Result<bool>;
}

/// Fixed, case-insensitive set of identities.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    identities: HashSet<String>,
}

impl StaticDirectory {
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            identities: identities
                .into_iter()
                .map(|s| normalize_identity(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Load one identity per line. Blank lines and `#` comments are skipped.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        ))
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn exists_by_identity(&self, identity: &str) -> Result<bool> {
        Ok(self.identities.contains(&normalize_identity(identity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let directory = StaticDirectory::new(["Alice@Example.com", "bob@example.com"]);
        assert!(directory.exists_by_identity("alice@example.com").await.unwrap());
        assert!(directory.exists_by_identity(" BOB@example.com").await.unwrap());
        assert!(!directory.exists_by_identity("carol@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_file_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# registered users").unwrap();
        writeln!(file, "a@b.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  C@D.com  ").unwrap();

        let directory = StaticDirectory::from_file(file.path()).await.unwrap();
        assert_eq!(directory.len(), 2);
        assert!(directory.exists_by_identity("c@d.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_missing_file_is_io_error() {
        let err = StaticDirectory::from_file("/nonexistent/identities.txt")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("IO error"));
    }
}
