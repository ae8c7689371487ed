//! Parsing of source arguments.

use std::path::{Path, PathBuf};

use crate::error::{ConduitError, Result};

/// Where to load server manifests from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// `registry:<id>`
    Registry { id: String },
    /// `git:<url>`, `github:<owner>/<repo>` or a `.git` URL.
    Git(GitSpec),
    /// Anything else: a manifest file or a directory.
    Local(PathBuf),
}

impl SourceSpec {
    /// Parse a source string.
    ///
    /// Supports formats:
    /// - `registry:io.github.acme/echo`
    /// - `git:https://example.com/repo.git#v1.0`
    /// - `github:acme/servers`, `github:acme/servers@main`
    /// - `https://example.com/repo.git#main`
    /// - `local:./servers/echo`, `./servers/echo/server.json`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ConduitError::validation("source", "source cannot be empty"));
        }

        if let Some(id) = input.strip_prefix("registry:") {
            if id.is_empty() {
                return Err(ConduitError::validation("source", "registry id cannot be empty"));
            }
            return Ok(SourceSpec::Registry { id: id.to_string() });
        }
        if let Some(raw) = input.strip_prefix("git:") {
            return GitSpec::parse(raw).map(SourceSpec::Git);
        }
        if let Some(shorthand) = input.strip_prefix("github:") {
            return GitSpec::github(shorthand).map(SourceSpec::Git);
        }
        if looks_like_git_url(input) {
            return GitSpec::parse(input).map(SourceSpec::Git);
        }

        let path = input.strip_prefix("local:").unwrap_or(input);
        Ok(SourceSpec::Local(PathBuf::from(path)))
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, SourceSpec::Local(_))
    }
}

fn looks_like_git_url(input: &str) -> bool {
    let base = input.split('#').next().unwrap_or(input);
    let remote = base.starts_with("https://")
        || base.starts_with("http://")
        || base.starts_with("ssh://")
        || base.starts_with("git@");
    remote && base.ends_with(".git")
}

/// A git repository and the ref to check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSpec {
    pub repo_url: String,
    /// Branch, tag or commit; `None` means the remote's default branch.
    pub reference: Option<String>,
}

impl GitSpec {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// `<url>` or `<url>#<ref>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (url, reference) = match raw.split_once('#') {
            Some((url, reference)) => (url, Some(reference)),
            None => (raw, None),
        };
        if url.is_empty() {
            return Err(ConduitError::validation("source", "git URL cannot be empty"));
        }
        let spec = Self::new(url);
        Ok(match reference.filter(|r| !r.is_empty()) {
            Some(reference) => spec.with_reference(reference),
            None => spec,
        })
    }

    /// `owner/repo`, `owner/repo@ref` or `owner/repo#ref`.
    pub fn github(shorthand: &str) -> Result<Self> {
        let (repo, reference) = match shorthand.split_once(['@', '#']) {
            Some((repo, reference)) => (repo, Some(reference)),
            None => (shorthand, None),
        };
        let mut parts = repo.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ConduitError::validation(
                "source",
                format!("invalid GitHub repo '{}': expected owner/repo", shorthand),
            ));
        };
        if owner.is_empty() || name.is_empty() {
            return Err(ConduitError::validation(
                "source",
                format!("invalid GitHub repo '{}': expected owner/repo", shorthand),
            ));
        }
        let name = name.strip_suffix(".git").unwrap_or(name);
        let spec = Self::new(format!("https://github.com/{}/{}.git", owner, name));
        Ok(match reference.filter(|r| !r.is_empty()) {
            Some(reference) => spec.with_reference(reference),
            None => spec,
        })
    }

    /// Checkout directory for this repository under `cache_dir`.
    pub fn checkout_dir(&self, cache_dir: &Path) -> PathBuf {
        let hash = blake3::hash(self.repo_url.as_bytes()).to_hex().to_string();
        cache_dir.join("git").join(hash)
    }

    /// URL recorded in the lock file, including the ref.
    pub fn display_url(&self) -> String {
        match &self.reference {
            Some(reference) => format!("{}#{}", self.repo_url, reference),
            None => self.repo_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_registry() {
        assert_eq!(
            SourceSpec::parse("registry:io.github.acme/echo").unwrap(),
            SourceSpec::Registry {
                id: "io.github.acme/echo".to_string()
            }
        );
        assert!(SourceSpec::parse("registry:").is_err());
    }

    #[test]
    fn parse_git_prefix_with_ref() {
        let spec = SourceSpec::parse("git:https://example.com/servers.git#v1.2").unwrap();
        assert_eq!(
            spec,
            SourceSpec::Git(GitSpec::new("https://example.com/servers.git").with_reference("v1.2"))
        );
    }

    #[test]
    fn parse_github_shorthand() {
        assert_eq!(
            SourceSpec::parse("github:acme/servers@main").unwrap(),
            SourceSpec::Git(GitSpec::new("https://github.com/acme/servers.git").with_reference("main"))
        );
        assert_eq!(
            SourceSpec::parse("github:acme/servers").unwrap(),
            SourceSpec::Git(GitSpec::new("https://github.com/acme/servers.git"))
        );
        assert!(SourceSpec::parse("github:acme").is_err());
        assert!(SourceSpec::parse("github:a/b/c").is_err());
    }

    #[test]
    fn parse_bare_git_url() {
        let spec = SourceSpec::parse("https://example.com/servers.git#dev").unwrap();
        assert!(matches!(spec, SourceSpec::Git(ref g) if g.reference.as_deref() == Some("dev")));
    }

    #[test]
    fn other_inputs_are_local_paths() {
        assert_eq!(
            SourceSpec::parse("./servers/echo").unwrap(),
            SourceSpec::Local(PathBuf::from("./servers/echo"))
        );
        assert_eq!(
            SourceSpec::parse("local:/abs/server.json").unwrap(),
            SourceSpec::Local(PathBuf::from("/abs/server.json"))
        );
        assert_eq!(
            SourceSpec::parse("https://example.com/server.json").unwrap(),
            SourceSpec::Local(PathBuf::from("https://example.com/server.json"))
        );
        assert!(SourceSpec::parse("   ").is_err());
    }

    #[test]
    fn checkout_dir_is_stable_per_url() {
        let a = GitSpec::new("https://example.com/a.git");
        let b = GitSpec::new("https://example.com/b.git");
        let cache = Path::new("/cache");
        assert_eq!(a.checkout_dir(cache), a.clone().with_reference("x").checkout_dir(cache));
        assert_ne!(a.checkout_dir(cache), b.checkout_dir(cache));
        assert!(a.checkout_dir(cache).starts_with("/cache/git"));
    }
}
