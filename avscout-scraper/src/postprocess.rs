//! Fields derived from the merged record rather than fetched.
//!
//! Runs once per movie after every connector has been merged. Derived values
//! carry the `derived` provenance tag.

use avscout_core::{Field, FieldValue, Identity, MetadataRecord, RecordError, is_uncensored};

/// Fill derived fields into `record`.
///
/// `genre_norm` is rebuilt from `genre` on every call. `uncensored` is only
/// filled when no connector reported it.
pub fn apply(identity: &Identity, record: &mut MetadataRecord) -> Result<(), RecordError> {
    if let Some(genres) = record.list(Field::Genre).map(normalize_genres) {
        record.set_derived(Field::GenreNorm, FieldValue::List(genres))?;
    }

    if !record.is_set(Field::Uncensored) {
        record.set_derived(Field::Uncensored, FieldValue::Flag(is_uncensored(identity)))?;
    }
    Ok(())
}

/// Trimmed, non-empty genres with case-insensitive duplicates removed. The
/// first spelling seen is kept.
pub fn normalize_genres(genres: &[String]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut out = Vec::new();
    for genre in genres {
        let genre = genre.trim();
        if genre.is_empty() {
            continue;
        }
        let folded = genre.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(genre.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use avscout_core::record::DERIVED_SOURCE;

    fn identity(key: &str) -> Identity {
        Identity::from_key(key, None).unwrap()
    }

    #[test]
    fn genres_are_trimmed_and_deduplicated() {
        let genres: Vec<String> = ["Drama", " drama ", "", "Comedy", "DRAMA", "  "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(normalize_genres(&genres), vec!["Drama", "Comedy"]);
    }

    #[test]
    fn derives_genre_norm_with_provenance() {
        let mut record = MetadataRecord::new();
        record
            .set_list::<Vec<String>, String>(Field::Genre, vec!["Idol".into(), "idol".into()])
            .unwrap();
        apply(&identity("ABC-123"), &mut record).unwrap();

        assert_eq!(record.list(Field::GenreNorm), Some(&["Idol".to_string()][..]));
        assert_eq!(record.source_of(Field::GenreNorm), Some(DERIVED_SOURCE));
    }

    #[test]
    fn no_genre_means_no_genre_norm() {
        let mut record = MetadataRecord::new();
        apply(&identity("ABC-123"), &mut record).unwrap();
        assert!(!record.is_set(Field::GenreNorm));
    }

    #[test]
    fn uncensored_comes_from_the_identity() {
        let mut fc2 = MetadataRecord::new();
        apply(&identity("FC2-123456"), &mut fc2).unwrap();
        assert_eq!(fc2.flag(Field::Uncensored), Some(true));

        let mut normal = MetadataRecord::new();
        apply(&identity("ABC-123"), &mut normal).unwrap();
        assert_eq!(normal.flag(Field::Uncensored), Some(false));
    }

    #[test]
    fn reported_uncensored_flag_is_kept() {
        let mut record = MetadataRecord::new();
        record.set_flag(Field::Uncensored, true).unwrap();
        apply(&identity("ABC-123"), &mut record).unwrap();

        assert_eq!(record.flag(Field::Uncensored), Some(true));
        assert_eq!(record.source_of(Field::Uncensored), None);
    }
}
