//! Where the credential list comes from.

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use snafu::prelude::*;

use crate::credential::Credential;

/// Read credential list error, fatal for the scheduler
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(variant), context(suffix(false)))]
pub enum Error {
    /// read credential file failed
    #[snafu(display("read credential list {} failed: {source}", path.display()))]
    ReadCredentialsFailed {
        /// credential file path
        path: PathBuf,
        /// source error
        source: std::io::Error,
    },
}

/// Result type for source module
pub type Result<T> = std::result::Result<T, Error>;

/// Produce the full credential list, called once per scheduler pass.
#[async_trait::async_trait]
pub trait CredentialSource: Debug + Send + Sync {
    /// current credential list in order
    async fn credentials(&self) -> Result<Vec<Credential>>;
}

/// In memory list, mostly for embedding and tests.
#[async_trait::async_trait]
impl CredentialSource for Vec<Credential> {
    async fn credentials(&self) -> Result<Vec<Credential>> {
        Ok(self.clone())
    }
}

/// Newline delimited credential file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// source reading file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// credential file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl CredentialSource for FileSource {
    async fn credentials(&self) -> Result<Vec<Credential>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .context(variant::ReadCredentialsFailed { path: &self.path })?;

        Ok(parse(&content))
    }
}

/// One credential per line, surrounding whitespace trimmed, blank lines skipped.
pub fn parse(content: &str) -> Vec<Credential> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Credential::new)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_credential_list() {
        let credentials = parse("a\r\n  b  \n\n\nc\n");

        assert_eq!(
            credentials,
            vec![Credential::new("a"), Credential::new("b"), Credential::new("c")]
        );
        assert!(parse("\n \n").is_empty());
    }

    #[tokio::test]
    async fn test_file_source() {
        let path = std::env::temp_dir().join(format!("keepalive-tokens-{}.txt", uuid::Uuid::new_v4()));

        let source = FileSource::new(&path);
        let err = source.credentials().await.unwrap_err();
        assert!(matches!(err, Error::ReadCredentialsFailed { .. }));

        tokio::fs::write(&path, "one\ntwo\n").await.unwrap();
        assert_eq!(source.credentials().await.unwrap().len(), 2);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
