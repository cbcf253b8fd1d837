//! Coverage and consensus scoring over document groups.
//!
//! A document group is every record that shares a `document_id`. Groups are rebuilt
//! from the records on every call; nothing is cached between passes and previously
//! derived scores are never inputs, so scoring the same measurements and texts twice
//! gives bit-identical results.
//!
//! - **coverage**: `text_char_count / max(text_char_count in group) * 100`, for every
//!   record whatever its status; 0 when the whole group has no text.
//! - **consensus**: for an `ok` record, the mean similarity to every other `ok` record
//!   in the group whose [`RecordKey`] differs, times 100. No peers, or a non-`ok`
//!   record, gives 0.

// Percentages are ratios of counts
#![allow(clippy::cast_precision_loss)]

use crate::progress::{Progress, ProgressEvent};
use crate::record::{RawRecord, RecordKey, ResultRecord};
use crate::similarity::Similarity;
use std::collections::HashMap;

/// Lookup of the extracted text for a record.
///
/// `index` is the record's position in the corpus being scored, so a source can tell
/// apart records that share a [`RecordKey`] but were read from different places.
/// Implementations must return an empty string for anything they cannot find or read.
pub trait TextSource {
    fn text(&self, index: usize, key: &RecordKey) -> String;
}

impl TextSource for HashMap<RecordKey, String> {
    fn text(&self, _index: usize, key: &RecordKey) -> String {
        self.get(key).cloned().unwrap_or_default()
    }
}

/// Score a whole corpus, group by group. Output order matches input order.
pub fn score_corpus(
    records: Vec<RawRecord>,
    texts: &dyn TextSource,
    similarity: &Similarity,
    progress: &dyn Progress,
) -> Vec<ResultRecord> {
    let mut group_order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups
            .entry(record.document_id.as_str())
            .or_insert_with(|| {
                group_order.push(record.document_id.as_str());
                Vec::new()
            })
            .push(idx);
    }

    let total_groups = group_order.len();
    let mut scored: Vec<Option<ResultRecord>> = vec![None; records.len()];
    for (group_idx, document) in group_order.iter().enumerate() {
        let members = &groups[document];
        let group: Vec<RawRecord> = members.iter().map(|&i| records[i].clone()).collect();
        progress.event(ProgressEvent::GroupScored {
            index: group_idx + 1,
            total: total_groups,
            document,
            records: group.len(),
        });
        let group_texts = load_texts(members.iter().map(|&i| (i, &records[i])), texts);
        for (&slot, result) in members
            .iter()
            .zip(score_loaded(group, group_texts, similarity))
        {
            scored[slot] = Some(result);
        }
    }

    scored.into_iter().flatten().collect()
}

/// Score the records of a single document group. Output order matches input order.
///
/// Texts are looked up with each record's position in `records` as its index.
#[must_use]
pub fn score_group(
    records: Vec<RawRecord>,
    texts: &dyn TextSource,
    similarity: &Similarity,
) -> Vec<ResultRecord> {
    let group_texts = load_texts(records.iter().enumerate(), texts);
    score_loaded(records, group_texts, similarity)
}

// Only ok records need a text
fn load_texts<'r>(
    records: impl Iterator<Item = (usize, &'r RawRecord)>,
    texts: &dyn TextSource,
) -> Vec<Option<String>> {
    records
        .map(|(index, record)| {
            record
                .status
                .is_ok()
                .then(|| texts.text(index, &record.key()))
        })
        .collect()
}

fn score_loaded(
    records: Vec<RawRecord>,
    texts: Vec<Option<String>>,
    similarity: &Similarity,
) -> Vec<ResultRecord> {
    let max_chars = records
        .iter()
        .map(|r| r.text_char_count)
        .max()
        .unwrap_or(0);
    let keys: Vec<RecordKey> = records.iter().map(RawRecord::key).collect();

    let mut pair_scores: HashMap<(usize, usize), f64> = HashMap::new();
    let mut pair_score = |a: usize, b: usize, text_a: &str, text_b: &str| -> f64 {
        *pair_scores
            .entry((a.min(b), a.max(b)))
            .or_insert_with(|| similarity.score(text_a, text_b))
    };

    let consensus: Vec<f64> = texts
        .iter()
        .enumerate()
        .map(|(own, own_text)| {
            let Some(own_text) = own_text else {
                return 0.0;
            };
            let mut scores: Vec<f64> = texts
                .iter()
                .enumerate()
                .filter(|(peer, _)| keys[*peer] != keys[own])
                .filter_map(|(peer, text)| text.as_deref().map(|text| (peer, text)))
                .map(|(peer, peer_text)| pair_score(own, peer, own_text, peer_text))
                .collect();
            mean_pct(&mut scores)
        })
        .collect();

    records
        .into_iter()
        .zip(consensus)
        .map(|(record, consensus_pct)| {
            let coverage_pct = if max_chars > 0 {
                record.text_char_count as f64 / max_chars as f64 * 100.0
            } else {
                0.0
            };
            record.finalize(coverage_pct, consensus_pct)
        })
        .collect()
}

/// Mean of `scores` times 100, independent of the order the scores arrived in.
fn mean_pct(scores: &mut [f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.sort_by(f64::total_cmp);
    scores.iter().sum::<f64>() / scores.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::record::Measurements;
    use crate::similarity::SimilarityStrategy;

    fn ok(doc: &str, extractor: &str, chars: u64) -> RawRecord {
        RawRecord::ok(
            doc,
            extractor,
            Measurements {
                text_char_count: chars,
                ..Measurements::default()
            },
        )
    }

    fn texts(entries: &[(&RawRecord, &str)]) -> HashMap<RecordKey, String> {
        entries
            .iter()
            .map(|(record, text)| (record.key(), (*text).to_string()))
            .collect()
    }

    fn jaccard() -> Similarity {
        Similarity::new(SimilarityStrategy::TokenJaccard)
    }

    #[test]
    fn test_coverage_relative_to_longest() {
        let a = ok("doc.pdf", "a", 1000);
        let b = ok("doc.pdf", "b", 900);
        let map = texts(&[(&a, "The quick brown fox"), (&b, "the   QUICK brown fox")]);

        let scored = score_group(vec![a, b], &map, &jaccard());
        assert_eq!(scored[0].coverage_pct(), 100.0);
        assert!((scored[1].coverage_pct() - 90.0).abs() < 1e-9);
        assert_eq!(scored[0].consensus_pct(), 100.0);
        assert_eq!(scored[1].consensus_pct(), 100.0);
    }

    #[test]
    fn test_all_empty_group_has_zero_coverage() {
        let a = ok("doc.pdf", "a", 0);
        let b = RawRecord::failed("doc.pdf", "b", "boom");
        let scored = score_group(vec![a, b], &HashMap::new(), &jaccard());
        assert!(scored.iter().all(|r| r.coverage_pct() == 0.0));
    }

    #[test]
    fn test_failed_peer_is_ignored() {
        let a = ok("doc.pdf", "a", 500);
        let b = RawRecord::failed("doc.pdf", "b", "broken xref table");
        let map = texts(&[(&a, "some text")]);

        let scored = score_group(vec![a, b], &map, &jaccard());
        assert_eq!(scored[0].coverage_pct(), 100.0);
        assert_eq!(scored[0].consensus_pct(), 0.0);
        assert_eq!(scored[1].coverage_pct(), 0.0);
        assert_eq!(scored[1].consensus_pct(), 0.0);
    }

    #[test]
    fn test_two_peers_share_the_pairwise_score() {
        let a = ok("doc.pdf", "a", 10);
        let b = ok("doc.pdf", "b", 10);
        let map = texts(&[(&a, "a b c"), (&b, "b c d")]);

        let sim = jaccard();
        let expected = sim.score("a b c", "b c d") * 100.0;
        let scored = score_group(vec![a, b], &map, &sim);
        assert_eq!(scored[0].consensus_pct(), expected);
        assert_eq!(scored[1].consensus_pct(), expected);
    }

    #[test]
    fn test_consensus_is_mean_over_peers() {
        let a = ok("doc.pdf", "a", 10);
        let b = ok("doc.pdf", "b", 10);
        let c = ok("doc.pdf", "c", 10);
        let map = texts(&[(&a, "x y"), (&b, "x y"), (&c, "z")]);

        let scored = score_group(vec![a, b, c], &map, &jaccard());
        // a: mean(1.0, 0.0)
        assert!((scored[0].consensus_pct() - 50.0).abs() < 1e-9);
        assert!((scored[1].consensus_pct() - 50.0).abs() < 1e-9);
        assert_eq!(scored[2].consensus_pct(), 0.0);
    }

    #[test]
    fn test_peer_order_does_not_change_scores() {
        let records = vec![
            ok("doc.pdf", "a", 30),
            ok("doc.pdf", "b", 20),
            ok("doc.pdf", "c", 10),
            ok("doc.pdf", "d", 40),
        ];
        let map: HashMap<RecordKey, String> = records
            .iter()
            .zip(["one two three", "two three four", "one four five", "six"])
            .map(|(r, t)| (r.key(), t.to_string()))
            .collect();

        let forward = score_group(records.clone(), &map, &jaccard());
        let mut reversed_input = records;
        reversed_input.reverse();
        let mut backward = score_group(reversed_input, &map, &jaccard());
        backward.reverse();

        for (f, b) in forward.iter().zip(&backward) {
            assert_eq!(f.consensus_pct().to_bits(), b.consensus_pct().to_bits());
            assert_eq!(f.coverage_pct().to_bits(), b.coverage_pct().to_bits());
        }
    }

    #[test]
    fn test_same_extractor_other_run_is_a_peer() {
        let a = ok("doc.pdf", "lopdf", 10).with_run_context("set-a");
        let b = ok("doc.pdf", "lopdf", 10).with_run_context("set-b");
        let map = texts(&[(&a, "alpha"), (&b, "alpha")]);

        let scored = score_group(vec![a, b], &map, &jaccard());
        assert_eq!(scored[0].consensus_pct(), 100.0);
        assert_eq!(scored[1].consensus_pct(), 100.0);
    }

    #[test]
    fn test_missing_texts_count_as_empty() {
        let a = ok("doc.pdf", "a", 10);
        let b = ok("doc.pdf", "b", 10);
        // Both texts missing: vacuous agreement
        let scored = score_group(vec![a, b], &HashMap::new(), &jaccard());
        assert_eq!(scored[0].consensus_pct(), 100.0);
    }

    /// Texts addressed by corpus position only.
    struct ByIndex(Vec<&'static str>);

    impl TextSource for ByIndex {
        fn text(&self, index: usize, _key: &RecordKey) -> String {
            self.0.get(index).map(|t| (*t).to_string()).unwrap_or_default()
        }
    }

    #[test]
    fn test_records_sharing_a_key_keep_their_own_text() {
        // One identity read from two places
        let first = ok("doc.pdf", "a", 10).with_run_context("r");
        let second = first.clone();
        let b = ok("doc.pdf", "b", 10).with_run_context("r");
        let source = ByIndex(vec!["x y", "z", "z"]);

        let scored = score_group(vec![first, second, b], &source, &jaccard());
        // Same key is never a peer, so each copy only meets b
        assert_eq!(scored[0].consensus_pct(), 0.0);
        assert_eq!(scored[1].consensus_pct(), 100.0);
        assert!((scored[2].consensus_pct() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_corpus_looks_texts_up_by_corpus_position() {
        let records = vec![
            ok("one.pdf", "a", 10),
            ok("two.pdf", "a", 10),
            ok("one.pdf", "b", 10),
            ok("two.pdf", "b", 10),
        ];
        let source = ByIndex(vec!["same", "left", "same", "right"]);
        let scored = score_corpus(records, &source, &jaccard(), &NullProgress);
        assert_eq!(scored[0].consensus_pct(), 100.0);
        assert_eq!(scored[1].consensus_pct(), 0.0);
        assert_eq!(scored[2].consensus_pct(), 100.0);
    }

    #[test]
    fn test_score_corpus_keeps_input_order_across_groups() {
        let records = vec![
            ok("one.pdf", "a", 10),
            ok("two.pdf", "a", 5),
            ok("one.pdf", "b", 5),
            ok("two.pdf", "b", 10),
        ];
        let scored = score_corpus(records, &HashMap::new(), &jaccard(), &NullProgress);
        let coverage: Vec<f64> = scored.iter().map(ResultRecord::coverage_pct).collect();
        assert_eq!(coverage, vec![100.0, 50.0, 50.0, 100.0]);
        assert_eq!(scored[1].raw().document_id, "two.pdf");
    }

    #[test]
    fn test_rescoring_is_idempotent() {
        let a = ok("doc.pdf", "a", 120);
        let b = ok("doc.pdf", "b", 80);
        let map = texts(&[(&a, "alpha beta gamma"), (&b, "alpha gamma")]);
        let sim = Similarity::new(SimilarityStrategy::EditRatio);

        let first = score_corpus(vec![a, b], &map, &sim, &NullProgress);
        let again: Vec<RawRecord> = first.iter().cloned().map(ResultRecord::into_raw).collect();
        let second = score_corpus(again, &map, &sim, &NullProgress);
        assert_eq!(first, second);
    }
}
