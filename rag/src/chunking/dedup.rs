//! Near-duplicate elimination for assembled chunks.

use std::collections::HashSet;

use xxhash_rust::xxh3::xxh3_64;

use crate::types::Chunk;

/// Jaccard similarity above which a consecutive pair counts as duplicated.
const JACCARD_CUTOFF: f32 = 0.85;

/// Characters taken from each end of the normalized content for the
/// fingerprint.
const FINGERPRINT_EDGE: usize = 50;

/// Drops exact near-duplicates and consecutive high-overlap chunks, then
/// reassigns dense indices starting at 0.
///
/// Exact duplicates are found via a cheap fingerprint over the normalized
/// content; consecutive survivors are compared with word-set Jaccard
/// similarity, keeping the longer of any pair above the cutoff.
pub(crate) fn dedup_chunks(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen: HashSet<u64> = HashSet::with_capacity(chunks.len());
    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let normalized = normalize_content(&chunk.content);
        if !seen.insert(xxh3_64(fingerprint(&normalized).as_bytes())) {
            continue;
        }

        if let Some(prev) = out.last() {
            let similarity = jaccard(&normalize_content(&prev.content), &normalized);
            if similarity > JACCARD_CUTOFF {
                if chunk.content.len() > prev.content.len() {
                    *out.last_mut().expect("non-empty") = chunk;
                }
                continue;
            }
        }

        out.push(chunk);
    }

    for (index, chunk) in out.iter_mut().enumerate() {
        chunk.chunk_index = index;
    }
    out
}

/// Lowercased content with whitespace runs collapsed to single spaces.
fn normalize_content(content: &str) -> String {
    content
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `first 50 chars | length | last 50 chars` of the normalized content.
fn fingerprint(normalized: &str) -> String {
    let chars: Vec<char> = normalized.chars().collect();
    let head: String = chars.iter().take(FINGERPRINT_EDGE).collect();
    let tail: String = chars
        .iter()
        .skip(chars.len().saturating_sub(FINGERPRINT_EDGE))
        .collect();
    format!("{head}|{}|{tail}", chars.len())
}

/// Word-set Jaccard similarity of two normalized contents.
#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &str, b: &str) -> f32 {
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use uuid::Uuid;

    use crate::types::ContentType;

    use super::*;

    fn chunk(index: usize, content: &str) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            file_id: "f".into(),
            chunk_index: index,
            content: content.into(),
            page_number: 1,
            start_page: 1,
            end_page: 1,
            section_title: None,
            content_type: ContentType::Text,
            contains_table: false,
            contains_list: false,
            image_references: BTreeSet::new(),
        }
    }

    #[test]
    fn exact_duplicates_are_dropped() {
        let chunks = vec![
            chunk(0, "Same paragraph repeated twice."),
            chunk(1, "Same paragraph repeated twice."),
        ];
        let out = dedup_chunks(chunks);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].chunk_index, 0);
    }

    #[test]
    fn case_and_whitespace_fold_into_one() {
        let chunks = vec![
            chunk(0, "Hello   World example"),
            chunk(1, "hello world EXAMPLE"),
        ];
        assert_eq!(dedup_chunks(chunks).len(), 1);
    }

    #[test]
    fn near_duplicates_keep_the_longer() {
        let base = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let longer = format!("{base} lambda");
        let chunks = vec![chunk(0, base), chunk(1, &longer)];
        let out = dedup_chunks(chunks);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, longer);
    }

    #[test]
    fn jaccard_exactly_at_cutoff_is_retained() {
        // 17 shared words, 20-word union: 17/20 = 0.85 exactly, not above.
        let shared: Vec<String> = (0..17).map(|i| format!("w{i}")).collect();
        let a = format!("{} a1 a2 a3", shared.join(" "));
        let b = shared.join(" ");
        let chunks = vec![chunk(0, &a), chunk(1, &b)];
        let out = dedup_chunks(chunks);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn distinct_chunks_get_dense_indices() {
        let chunks = vec![
            chunk(0, "first section about storage engines"),
            chunk(1, "first section about storage engines"),
            chunk(2, "entirely different topic on caching"),
        ];
        let out = dedup_chunks(chunks);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk_index, 0);
        assert_eq!(out[1].chunk_index, 1);
    }

    #[test]
    fn single_small_chunk_survives() {
        let out = dedup_chunks(vec![chunk(0, "Tiny.")]);
        assert_eq!(out.len(), 1);
    }
}
