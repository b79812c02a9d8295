//! Changeset placeholder and tag sanitation.

use std::sync::LazyLock;

use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use rf_core::{TagMap, TAG_MAX_LENGTH};

/// The per-process token standing in for a not-yet-assigned changeset id.
///
/// Random so that stale documents from a previous process can never be
/// accidentally resolved against a new changeset.
pub fn changeset_placeholder() -> &'static str {
    static TOKEN: LazyLock<String> = LazyLock::new(|| {
        let suffix: String = SmallRng::from_entropy()
            .sample_iter(&Alphanumeric)
            .take(11)
            .map(char::from)
            .collect();
        format!("__CHANGESET_ID_PLACEHOLDER_{suffix}__")
    });
    &TOKEN
}

/// Replace every placeholder occurrence with the real changeset id —
/// called immediately before upload.
pub fn apply_changeset_id(document: &str, changeset_id: i64) -> String {
    document.replace(changeset_placeholder(), &changeset_id.to_string())
}

/// Sanitize changeset tags in place: drop empty values and truncate
/// over-long ones to the tag length limit with a trailing ellipsis.
pub fn sanitize_changeset_tags(tags: &mut TagMap) {
    tags.retain(|_, value| !value.is_empty());

    for (key, value) in tags.iter_mut() {
        if value.chars().count() > TAG_MAX_LENGTH {
            log::warn!("truncating changeset tag {key:?}: value exceeds {TAG_MAX_LENGTH} chars");
            let mut truncated: String = value.chars().take(TAG_MAX_LENGTH - 1).collect();
            truncated.push('…');
            *value = truncated;
        }
    }
}
