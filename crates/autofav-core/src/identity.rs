//! Commit author to account resolution.
//!
//! Resolution never creates accounts and never fails: directory errors are
//! logged and count as a miss.

use std::sync::Arc;

use async_trait::async_trait;
use autofav_git::Changeset;
use autofav_state::{Account, AccountDirectory, LookupMode};
use tracing::{debug, warn};

use crate::config::IdentityPolicyKind;

/// Who authored a changeset, as far as the directory knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Known(Account),
    Unknown,
}

impl Identity {
    pub fn account(&self) -> Option<&Account> {
        match self {
            Identity::Known(account) => Some(account),
            Identity::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Identity::Unknown)
    }
}

/// Strategy mapping a changeset author to an account.
#[async_trait]
pub trait IdentityPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, directory: &dyn AccountDirectory, changeset: &Changeset) -> Identity;
}

/// The author string must be an existing account id.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactIdPolicy;

/// [`ExactIdPolicy`], then the author email against account mail aliases.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailAliasPolicy;

/// Policy implementation for a configured kind.
pub fn policy_for(kind: IdentityPolicyKind) -> Arc<dyn IdentityPolicy> {
    match kind {
        IdentityPolicyKind::Exact => Arc::new(ExactIdPolicy),
        IdentityPolicyKind::EmailAlias => Arc::new(EmailAliasPolicy),
    }
}

async fn lookup_exact(directory: &dyn AccountDirectory, author: &str) -> Option<Account> {
    if author.is_empty() {
        return None;
    }
    match directory.lookup(author, LookupMode::Existing).await {
        Ok(Some(account)) if !account.is_unknown() => Some(account),
        Ok(_) => None,
        Err(e) => {
            warn!(author = %author, error = %e, "account lookup failed");
            None
        }
    }
}

async fn lookup_by_alias(directory: &dyn AccountDirectory, email: &str) -> Option<Account> {
    let needle = email.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let accounts = match directory.list_all().await {
        Ok(accounts) => accounts,
        Err(e) => {
            warn!(error = %e, "account listing failed");
            return None;
        }
    };

    for account in accounts {
        if account.is_unknown() {
            continue;
        }
        match directory.mail_aliases(&account).await {
            Ok(Some(aliases)) => {
                if aliases.iter().any(|alias| alias.trim().to_lowercase() == needle) {
                    return Some(account);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(account = %account.id, error = %e, "mail alias lookup failed"),
        }
    }
    None
}

#[async_trait]
impl IdentityPolicy for ExactIdPolicy {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn resolve(&self, directory: &dyn AccountDirectory, changeset: &Changeset) -> Identity {
        match lookup_exact(directory, &changeset.author).await {
            Some(account) => Identity::Known(account),
            None => {
                debug!(author = %changeset.author, "no account for author");
                Identity::Unknown
            }
        }
    }
}

#[async_trait]
impl IdentityPolicy for EmailAliasPolicy {
    fn name(&self) -> &'static str {
        "email-alias"
    }

    async fn resolve(&self, directory: &dyn AccountDirectory, changeset: &Changeset) -> Identity {
        if let Some(account) = lookup_exact(directory, &changeset.author).await {
            return Identity::Known(account);
        }
        let Some(email) = changeset.author_email.as_deref() else {
            return Identity::Unknown;
        };
        match lookup_by_alias(directory, email).await {
            Some(account) => {
                debug!(email = %email, account = %account.id, "author matched by mail alias");
                Identity::Known(account)
            }
            None => Identity::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use autofav_state::fakes::MemoryAccountDirectory;

    use super::*;

    fn changeset(author: &str, email: Option<&str>) -> Changeset {
        Changeset {
            revision: "abc123".into(),
            author: author.into(),
            author_email: email.map(str::to_string),
            summary: "Initial commit".into(),
        }
    }

    fn directory() -> MemoryAccountDirectory {
        MemoryAccountDirectory::with_accounts([
            Account::new("jdumay").with_email("jdumay@example.com"),
            Account::new("vivek").with_mail_aliases(["Vivek@Work.example.com"]),
        ])
    }

    #[tokio::test]
    async fn exact_match_resolves() {
        let dir = directory();
        let identity = ExactIdPolicy.resolve(&dir, &changeset("jdumay", None)).await;
        assert_eq!(identity.account().map(|a| a.id.as_str()), Some("jdumay"));
        assert_eq!(dir.lookups(), vec![("jdumay".to_string(), LookupMode::Existing)]);
    }

    #[tokio::test]
    async fn exact_miss_is_unknown_and_creates_nothing() {
        let dir = directory();
        let identity = ExactIdPolicy
            .resolve(&dir, &changeset("stranger", Some("vivek@work.example.com")))
            .await;
        assert!(identity.is_unknown());
        assert_eq!(dir.created_count(), 0);
        assert_eq!(dir.len(), 2);
    }

    #[tokio::test]
    async fn sentinel_account_is_unknown() {
        let dir = MemoryAccountDirectory::with_accounts([Account::unknown()]);
        let identity = ExactIdPolicy.resolve(&dir, &changeset("unknown", None)).await;
        assert!(identity.is_unknown());
    }

    #[tokio::test]
    async fn directory_failure_is_a_miss() {
        let dir = directory();
        dir.set_unavailable(true);
        let identity = EmailAliasPolicy
            .resolve(&dir, &changeset("jdumay", Some("vivek@work.example.com")))
            .await;
        assert!(identity.is_unknown());
    }

    #[tokio::test]
    async fn alias_matches_case_insensitively() {
        let dir = directory();
        let identity = EmailAliasPolicy
            .resolve(&dir, &changeset("Vivek Pandey", Some("vivek@WORK.example.com")))
            .await;
        assert_eq!(identity.account().map(|a| a.id.as_str()), Some("vivek"));
        assert_eq!(dir.created_count(), 0);
    }

    #[tokio::test]
    async fn alias_policy_prefers_exact_id() {
        let dir = directory();
        let identity = EmailAliasPolicy
            .resolve(&dir, &changeset("jdumay", Some("vivek@work.example.com")))
            .await;
        assert_eq!(identity.account().map(|a| a.id.as_str()), Some("jdumay"));
    }

    #[tokio::test]
    async fn alias_policy_without_email_is_unknown() {
        let dir = directory();
        let identity = EmailAliasPolicy.resolve(&dir, &changeset("Vivek Pandey", None)).await;
        assert!(identity.is_unknown());
    }

    #[test]
    fn policy_selection() {
        assert_eq!(policy_for(IdentityPolicyKind::Exact).name(), "exact");
        assert_eq!(policy_for(IdentityPolicyKind::EmailAlias).name(), "email-alias");
    }
}
