//! Parsing of `git log --format=raw` changelog text.
//!
//! Both backends emit this format, so one parser serves both. The parser is a
//! trait so hosts with their own changelog format can swap it out.

use std::sync::OnceLock;

use regex::Regex;

use crate::changeset::Changeset;
use crate::error::GitError;
use crate::Result;

/// Turns changelog text into structured changesets.
pub trait ChangelogParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Vec<Changeset>>;
}

/// Parser for the raw log format:
///
/// ```text
/// commit <sha>
/// tree <sha>
/// parent <sha>
/// author <name> <<email>> <epoch> <tz>
/// committer <name> <<email>> <epoch> <tz>
///
///     <message lines, indented four spaces>
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RawChangelogParser;

impl RawChangelogParser {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct Entry {
    revision: String,
    author: Option<(String, Option<String>)>,
    summary: Option<String>,
}

impl Entry {
    fn finish(self) -> Result<Changeset> {
        let (author, author_email) = self.author.ok_or_else(|| {
            GitError::Malformed(format!("commit {} has no author line", self.revision))
        })?;
        Ok(Changeset {
            revision: self.revision,
            author,
            author_email,
            summary: self.summary.unwrap_or_default(),
        })
    }
}

fn author_line() -> &'static Regex {
    static AUTHOR: OnceLock<Regex> = OnceLock::new();
    AUTHOR.get_or_init(|| {
        Regex::new(r"^author (.*?)\s*<([^>]*)>\s+(\d+)\s+([+-]\d{4})\s*$").expect("static pattern")
    })
}

fn parse_author(line: &str) -> Result<(String, Option<String>)> {
    let caps = author_line()
        .captures(line)
        .ok_or_else(|| GitError::Malformed(format!("unparseable author line: {line:?}")))?;

    let name = caps[1].trim().to_string();
    let email = Some(caps[2].trim().to_string()).filter(|e| !e.is_empty());

    // an author with no name is identified by their email
    let author = match (name.is_empty(), &email) {
        (false, _) => name,
        (true, Some(email)) => email.clone(),
        (true, None) => {
            return Err(GitError::Malformed(format!(
                "author line has neither name nor email: {line:?}"
            )))
        }
    };
    Ok((author, email))
}

impl ChangelogParser for RawChangelogParser {
    fn parse(&self, text: &str) -> Result<Vec<Changeset>> {
        let mut changesets = Vec::new();
        let mut current: Option<Entry> = None;

        for line in text.lines() {
            if let Some(sha) = line.strip_prefix("commit ") {
                if let Some(entry) = current.take() {
                    changesets.push(entry.finish()?);
                }
                let revision = sha.split_whitespace().next().unwrap_or_default();
                if revision.is_empty() {
                    return Err(GitError::Malformed("commit line without id".to_string()));
                }
                current = Some(Entry {
                    revision: revision.to_string(),
                    ..Entry::default()
                });
                continue;
            }

            let Some(entry) = current.as_mut() else {
                if line.trim().is_empty() {
                    continue;
                }
                return Err(GitError::Malformed(format!(
                    "expected a commit line, found {line:?}"
                )));
            };

            if let Some(message) = line.strip_prefix("    ") {
                if entry.summary.is_none() && !message.trim().is_empty() {
                    entry.summary = Some(message.trim().to_string());
                }
            } else if line.starts_with("author ") {
                entry.author = Some(parse_author(line)?);
            }
            // tree, parent, committer, signature continuations and raw diff
            // lines carry nothing reconciliation needs
        }

        if let Some(entry) = current.take() {
            changesets.push(entry.finish()?);
        }
        Ok(changesets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_COMMIT: &str = "\
commit 3f2a9c0d8b7e6f5a4c3b2a1908f7e6d5c4b3a291
tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904
author jdumay <jdumay@example.com> 1479340800 +1100
committer jdumay <jdumay@example.com> 1479340800 +1100

    Initial commit

    With a body.
";

    #[test]
    fn parses_single_entry() {
        let changesets = RawChangelogParser.parse(ONE_COMMIT).unwrap();
        assert_eq!(changesets.len(), 1);
        let cs = &changesets[0];
        assert_eq!(cs.revision, "3f2a9c0d8b7e6f5a4c3b2a1908f7e6d5c4b3a291");
        assert_eq!(cs.author, "jdumay");
        assert_eq!(cs.author_email.as_deref(), Some("jdumay@example.com"));
        assert_eq!(cs.summary, "Initial commit");
    }

    #[test]
    fn empty_text_is_no_changesets() {
        assert!(RawChangelogParser.parse("").unwrap().is_empty());
        assert!(RawChangelogParser.parse("\n\n").unwrap().is_empty());
    }

    #[test]
    fn parses_multiple_entries_with_parents_and_signatures() {
        let text = "\
commit aaaa
tree 1111
parent bbbb
author Alice Example <alice@example.com> 1700000000 -0500
committer Alice Example <alice@example.com> 1700000000 -0500
gpgsig -----BEGIN PGP SIGNATURE-----
 iQEzBAABCAAdFiEE
 -----END PGP SIGNATURE-----

    Second

commit bbbb
tree 2222
author Bob <bob@example.com> 1600000000 +0000
committer Bob <bob@example.com> 1600000000 +0000

    First
";
        let changesets = RawChangelogParser.parse(text).unwrap();
        assert_eq!(changesets.len(), 2);
        assert_eq!(changesets[0].author, "Alice Example");
        assert_eq!(changesets[0].summary, "Second");
        assert_eq!(changesets[1].revision, "bbbb");
        assert_eq!(changesets[1].author, "Bob");
    }

    #[test]
    fn nameless_author_falls_back_to_email() {
        let text = "commit cccc\nauthor <ghost@example.com> 1700000000 +0000\n";
        let changesets = RawChangelogParser.parse(text).unwrap();
        assert_eq!(changesets[0].author, "ghost@example.com");
    }

    #[test]
    fn empty_email_is_none() {
        let text = "commit cccc\nauthor Nobody <> 1700000000 +0000\n";
        let changesets = RawChangelogParser.parse(text).unwrap();
        assert_eq!(changesets[0].author, "Nobody");
        assert_eq!(changesets[0].author_email, None);
    }

    #[test]
    fn missing_author_is_malformed() {
        let text = "commit dddd\ntree 1111\n\n    no author here\n";
        let err = RawChangelogParser.parse(text).unwrap_err();
        assert!(matches!(err, GitError::Malformed(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = RawChangelogParser
            .parse("fatal: this is not a changelog\n")
            .unwrap_err();
        assert!(matches!(err, GitError::Malformed(_)));
    }
}
