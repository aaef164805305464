//! Image tag and repository name rules
//!
//! Destination tags follow the Docker tag grammar: a word character followed
//! by up to 127 word characters, dashes or dots.

use regex::Regex;
use std::sync::LazyLock;

/// Longest tag accepted by the registry
pub const MAX_TAG_LENGTH: usize = 128;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9_\-.]{0,127}$").expect("tag pattern is valid")
});

static DIGEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sha256:[0-9a-fA-F]{64}$").expect("digest pattern is valid")
});

static REPO_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("repository name pattern is valid")
});

/// Whether `tag` is an acceptable destination tag
pub fn is_valid_tag(tag: &str) -> bool {
    TAG_PATTERN.is_match(tag)
}

/// Whether `reference` is a content digest rather than a tag
pub fn is_digest(reference: &str) -> bool {
    DIGEST_PATTERN.is_match(reference)
}

/// Whether `name` is acceptable for a new local repository or mirror
pub fn is_valid_repo_name(name: &str) -> bool {
    REPO_NAME_PATTERN.is_match(name)
}
