//! Chunk segmentation tests.

use growth_advisor::messaging::{segment, Segmenter};

const SAMPLE: &str = "  Focus on one channel first. Then: measure CAC,\nretention, and payback!\n\nDone?  Ship   it ";

fn batch(text: &str, min_words: usize) -> Vec<&str> {
    segment(text, min_words).collect()
}

fn incremental(fragments: &[&str], min_words: usize) -> Vec<String> {
    let mut segmenter = Segmenter::new(min_words);
    let mut chunks: Vec<String> = fragments.iter().flat_map(|f| segmenter.push(f)).collect();
    chunks.extend(segmenter.finish());
    chunks
}

#[test]
fn concatenation_reproduces_input_exactly() {
    for min_words in 1..=5 {
        let joined: String = batch(SAMPLE, min_words).concat();
        assert_eq!(joined, SAMPLE, "min_words = {min_words}");
    }
}

#[test]
fn chunks_flush_at_min_words_or_clause_end() {
    assert_eq!(
        batch("one two three four five", 2),
        vec!["one two ", "three four ", "five"]
    );
    assert_eq!(
        batch("Hi. This is it: done", 3),
        vec!["Hi. ", "This is it: ", "done"]
    );
}

#[test]
fn no_chunk_exceeds_min_words_unless_clause_closes_early() {
    for chunk in segment(SAMPLE, 3) {
        assert!(chunk.split_whitespace().count() <= 3, "{chunk:?}");
        assert!(!chunk.trim().is_empty());
    }
}

#[test]
fn newline_closes_a_clause() {
    assert_eq!(batch("line one\nline two", 5), vec!["line one\n", "line two"]);
}

#[test]
fn leading_whitespace_rides_on_first_chunk() {
    assert_eq!(batch("   hello world", 1), vec!["   hello ", "world"]);
}

#[test]
fn empty_and_blank_inputs() {
    assert!(batch("", 2).is_empty());
    assert_eq!(batch("   ", 2), vec!["   "]);
}

#[test]
fn zero_min_words_behaves_like_one() {
    assert_eq!(batch("a b", 0), vec!["a ", "b"]);
}

#[test]
fn sequence_is_finite_and_forward_only() {
    let mut chunks = segment("a b c", 1);
    assert_eq!(chunks.next(), Some("a "));
    assert_eq!(chunks.next(), Some("b "));
    assert_eq!(chunks.next(), Some("c"));
    assert_eq!(chunks.next(), None);
    assert_eq!(chunks.next(), None);
}

#[test]
fn incremental_matches_batch_for_any_fragmentation() {
    let chars: Vec<char> = SAMPLE.chars().collect();
    for size in [1, 2, 3, 5, 8, 64] {
        let fragments: Vec<String> = chars.chunks(size).map(|c| c.iter().collect()).collect();
        let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
        for min_words in [1, 2, 3] {
            assert_eq!(
                incremental(&refs, min_words),
                batch(SAMPLE, min_words),
                "fragment size {size}, min_words {min_words}"
            );
        }
    }
}

#[test]
fn incremental_holds_last_word_until_finish() {
    let mut segmenter = Segmenter::new(1);
    assert!(segmenter.push("hel").is_empty());
    assert!(segmenter.push("lo ").is_empty());
    assert_eq!(segmenter.push("wor"), vec!["hello ".to_owned()]);
    assert_eq!(segmenter.finish(), Some("wor".to_owned()));
    assert_eq!(segmenter.finish(), None);
}

#[test]
fn multibyte_text_is_preserved() {
    let text = "Café résumé naïve — ok 🚀 launch.";
    let joined: String = incremental(&["Caf", "é rés", "umé naïve — ok 🚀", " launch."], 2).concat();
    assert_eq!(joined, text);
}
