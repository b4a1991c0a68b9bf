//! Structure-aware chunking of normalized document text.
//!
//! The chunker walks the cleaned text paragraph by paragraph, carries the
//! nearest heading, detects tables and lists, assembles word-budgeted
//! chunks with sentence overlap, attaches page-span images and finally
//! drops near-duplicates. Bad input never errors; it just yields fewer
//! chunks.

mod dedup;
mod detect;
mod sentence;

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::normalize::{TABLE_BEGIN, TABLE_END};
use crate::types::{Chunk, ContentType, ImageRef};

use dedup::dedup_chunks;
use detect::{block_contains_list, block_contains_table, is_heading};
use sentence::{Paragraph, Sentence, page_marker_number, split_block_sentences};

/// Splits normalized text into retrieval chunks for one file.
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    target_chunk_size: usize,
    min_chunk_size: usize,
    max_chunk_size: usize,
    overlap_sentences: usize,
}

impl DocumentChunker {
    /// Creates a chunker with explicit word budgets.
    #[must_use]
    pub const fn new(
        target_chunk_size: usize,
        min_chunk_size: usize,
        max_chunk_size: usize,
        overlap_sentences: usize,
    ) -> Self {
        Self {
            target_chunk_size,
            min_chunk_size,
            max_chunk_size,
            overlap_sentences,
        }
    }

    /// Creates a chunker from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.target_chunk_size,
            config.min_chunk_size,
            config.max_chunk_size,
            config.overlap_sentences,
        )
    }

    /// Chunks cleaned text, attaching images whose page falls inside each
    /// chunk's span.
    ///
    /// Chunk indices in the result are dense and start at 0.
    #[must_use]
    pub fn chunk(&self, clean_text: &str, file_id: &str, images: &[ImageRef]) -> Vec<Chunk> {
        let paragraphs = build_paragraphs(clean_text);
        let chunks = self.assemble(paragraphs, file_id);
        let chunks = attach_images(chunks, images);
        dedup_chunks(chunks)
    }

    fn assemble(&self, paragraphs: Vec<Paragraph>, file_id: &str) -> Vec<Chunk> {
        let mut ctx = ChunkingContext::new(file_id);
        let mut chunks = Vec::new();

        for paragraph in paragraphs {
            if paragraph.is_page_break() {
                if let Some(page) = paragraph.page_number {
                    ctx.push(Sentence::page_break(page));
                }
                continue;
            }

            if let Some(heading) = paragraph.heading {
                if ctx.fresh_word_count() > 0 && ctx.word_count >= self.min_chunk_size {
                    // A new section starts; the previous chunk does not
                    // bleed into it through overlap.
                    ctx.close(&mut chunks, 0);
                }
                ctx.begins_with_heading = ctx.content_len() == 0;
                ctx.current_heading = Some(heading);
            }

            ctx.contains_table |= paragraph.contains_table;
            ctx.contains_list |= paragraph.contains_list;

            for sentence in paragraph.sentences {
                // Close early rather than letting the buffer overshoot the
                // hard maximum; a single oversized sentence still goes
                // through whole.
                if ctx.word_count + sentence.word_count > self.max_chunk_size
                    && ctx.fresh_word_count() > 0
                    && ctx.word_count >= self.min_chunk_size
                {
                    ctx.close(&mut chunks, self.overlap_sentences);
                }
                ctx.push(sentence);
            }

            if ctx.word_count >= self.target_chunk_size {
                ctx.close(&mut chunks, self.overlap_sentences);
            }
        }

        ctx.finish(&mut chunks, self.min_chunk_size);
        chunks
    }
}

/// Rolling buffer state for the assembly loop.
struct ChunkingContext {
    file_id: String,
    buffer: Vec<Sentence>,
    word_count: usize,
    /// Leading sentences replayed from the previous chunk's tail.
    carried: usize,
    current_heading: Option<String>,
    begins_with_heading: bool,
    contains_table: bool,
    contains_list: bool,
}

impl ChunkingContext {
    fn new(file_id: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            buffer: Vec::new(),
            word_count: 0,
            carried: 0,
            current_heading: None,
            begins_with_heading: false,
            contains_table: false,
            contains_list: false,
        }
    }

    fn push(&mut self, sentence: Sentence) {
        self.word_count += sentence.word_count;
        self.buffer.push(sentence);
    }

    fn content_len(&self) -> usize {
        self.buffer.iter().filter(|s| !s.is_page_break).count()
    }

    fn fresh_word_count(&self) -> usize {
        self.buffer
            .iter()
            .filter(|s| !s.is_page_break)
            .skip(self.carried)
            .map(|s| s.word_count)
            .sum()
    }

    /// Closes the buffer into a chunk, keeping `overlap` trailing sentences
    /// as the seed of the next chunk.
    fn close(&mut self, out: &mut Vec<Chunk>, overlap: usize) {
        let content: Vec<&Sentence> = self.buffer.iter().filter(|s| !s.is_page_break).collect();
        if content.len() <= self.carried {
            // Nothing beyond the replayed tail; emitting would only
            // duplicate the previous chunk.
            self.reset_after_close(overlap);
            return;
        }

        let text: Vec<&str> = content.iter().map(|s| s.text.as_str()).collect();
        let start_page = content
            .first()
            .and_then(|s| s.page_number)
            .unwrap_or(1);
        let end_page = content
            .last()
            .and_then(|s| s.page_number)
            .unwrap_or(start_page)
            .max(start_page);

        let content_type = if self.begins_with_heading {
            ContentType::Heading
        } else {
            match (self.contains_table, self.contains_list) {
                (true, true) => ContentType::Mixed,
                (true, false) => ContentType::Table,
                (false, true) => ContentType::List,
                (false, false) => ContentType::Text,
            }
        };

        out.push(Chunk {
            id: Uuid::new_v4(),
            file_id: self.file_id.clone(),
            chunk_index: out.len(),
            content: text.join(" "),
            page_number: start_page,
            start_page,
            end_page,
            section_title: self.current_heading.clone(),
            content_type,
            contains_table: self.contains_table,
            contains_list: self.contains_list,
            image_references: BTreeSet::new(),
        });

        self.reset_after_close(overlap);
    }

    fn reset_after_close(&mut self, overlap: usize) {
        let content: Vec<Sentence> = self
            .buffer
            .iter()
            .filter(|s| !s.is_page_break)
            .cloned()
            .collect();
        let tail_start = content.len().saturating_sub(overlap);
        self.buffer = content[tail_start..].to_vec();
        self.carried = self.buffer.len();
        self.word_count = self.buffer.iter().map(|s| s.word_count).sum();
        self.contains_table = false;
        self.contains_list = false;
        self.begins_with_heading = false;
    }

    /// Flushes the residual buffer: a residual at or above the minimum
    /// becomes the final chunk, anything smaller is absorbed into the
    /// previous one.
    fn finish(mut self, out: &mut Vec<Chunk>, min_chunk_size: usize) {
        if self.fresh_word_count() == 0 {
            return;
        }

        if self.word_count >= min_chunk_size || out.is_empty() {
            self.close(out, 0);
            return;
        }

        let fresh: Vec<Sentence> = self
            .buffer
            .iter()
            .filter(|s| !s.is_page_break)
            .skip(self.carried)
            .cloned()
            .collect();
        let last = out.last_mut().expect("checked non-empty");
        for sentence in &fresh {
            last.content.push(' ');
            last.content.push_str(&sentence.text);
            if let Some(page) = sentence.page_number {
                last.end_page = last.end_page.max(page);
            }
        }
        last.contains_table |= self.contains_table;
        last.contains_list |= self.contains_list;
        if last.contains_table && last.contains_list && last.content_type != ContentType::Heading {
            last.content_type = ContentType::Mixed;
        }
    }
}

/// Walks the cleaned text once, tracking the running page and grouping
/// sentences by blank-line boundaries. Table regions survive intact even
/// when they contain blank lines.
fn build_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current_page: Option<u32> = None;
    let mut block: Vec<&str> = Vec::new();
    let mut in_table = false;

    for line in text.lines() {
        if let Some(page) = page_marker_number(line) {
            flush_block(&mut block, current_page, &mut paragraphs);
            current_page = Some(page);
            paragraphs.push(Paragraph {
                sentences: Vec::new(),
                page_number: Some(page),
                heading: None,
                contains_table: false,
                contains_list: false,
            });
            continue;
        }

        if line.trim() == TABLE_BEGIN {
            in_table = true;
        } else if line.trim() == TABLE_END {
            in_table = false;
            block.push(line);
            continue;
        }

        if line.trim().is_empty() && !in_table {
            flush_block(&mut block, current_page, &mut paragraphs);
        } else {
            block.push(line);
        }
    }
    flush_block(&mut block, current_page, &mut paragraphs);

    paragraphs
}

fn flush_block(block: &mut Vec<&str>, page: Option<u32>, out: &mut Vec<Paragraph>) {
    if block.is_empty() {
        return;
    }
    let body = block.join("\n");
    block.clear();
    if body.trim().is_empty() {
        return;
    }
    out.push(paragraph_from_block(&body, page));
}

fn paragraph_from_block(body: &str, page: Option<u32>) -> Paragraph {
    let first_line = body.lines().next().unwrap_or_default().trim();
    let starts_with_table = first_line.starts_with(TABLE_BEGIN);

    let heading = if !starts_with_table && is_heading(first_line) {
        Some(first_line.to_string())
    } else {
        None
    };

    let mut sentences = Vec::new();
    let remainder = if heading.is_some() {
        sentences.push(Sentence::content(first_line.to_string(), page));
        body.split_once('\n').map_or("", |(_, rest)| rest)
    } else {
        body
    };

    for text in split_block_sentences(remainder) {
        sentences.push(Sentence::content(text, page));
    }

    Paragraph {
        contains_table: block_contains_table(body),
        contains_list: block_contains_list(body),
        sentences,
        page_number: page,
        heading,
    }
}

fn attach_images(mut chunks: Vec<Chunk>, images: &[ImageRef]) -> Vec<Chunk> {
    if images.is_empty() {
        return chunks;
    }

    let mut by_page: HashMap<u32, Vec<Uuid>> = HashMap::new();
    for image in images {
        by_page.entry(image.page_number).or_default().push(image.id);
    }

    for chunk in &mut chunks {
        for page in chunk.start_page..=chunk.end_page {
            if let Some(ids) = by_page.get(&page) {
                chunk.image_references.extend(ids.iter().copied());
            }
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{NormalizeOptions, normalize_pages};

    fn chunker(target: usize, min: usize, max: usize, overlap: usize) -> DocumentChunker {
        DocumentChunker::new(target, min, max, overlap)
    }

    fn pages_text(pages: &[(u32, &str)]) -> String {
        let owned: Vec<(u32, String)> = pages
            .iter()
            .map(|(n, t)| (*n, (*t).to_string()))
            .collect();
        normalize_pages(&owned, &NormalizeOptions::default())
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = chunker(20, 5, 40, 2).chunk("", "f1", &[]);
        assert!(chunks.is_empty());
    }

    #[test]
    fn single_small_sentence_emits_one_chunk() {
        let chunks = chunker(500, 60, 750, 2).chunk("Just one tiny sentence.", "f1", &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Just one tiny sentence.");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn two_page_document_with_headings() {
        let text = pages_text(&[
            (
                1,
                "# Introduction\n\nThis chapter introduces the system. It explains basic concepts.",
            ),
            (
                2,
                "# Methods\n\nWe used cardiac arrest resuscitation guidelines (CPR).",
            ),
        ]);
        let chunks = chunker(20, 5, 750, 2).chunk(&text, "f1", &[]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title.as_deref(), Some("# Introduction"));
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[1].section_title.as_deref(), Some("# Methods"));
        assert_eq!(chunks[1].page_number, 2);
        assert!(chunks[1].content.contains("cardiac arrest"));
    }

    #[test]
    fn chunk_indices_are_dense_from_zero() {
        let long: String = (0..40)
            .map(|i| format!("Sentence number {i} talks about topic {i}."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker(20, 5, 40, 2).chunk(&long, "f1", &[]);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert!(chunk.start_page <= chunk.end_page);
        }
    }

    #[test]
    fn overlap_sentences_replay_at_next_chunk_head() {
        let long: String = (0..20)
            .map(|i| format!("Distinct sentence number {i} appears here."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker(18, 5, 24, 2).chunk(&long, "f1", &[]);
        assert!(chunks.len() > 1);

        // The tail sentence of each chunk must reappear at the head of the next.
        for pair in chunks.windows(2) {
            let last_sentence = pair[0]
                .content
                .rsplit(". ")
                .next()
                .unwrap()
                .trim_end_matches('.');
            assert!(
                pair[1].content.contains(last_sentence),
                "expected {:?} to lead into {:?}",
                last_sentence,
                pair[1].content
            );
        }
    }

    #[test]
    fn repeated_paragraph_dedups_to_one_chunk() {
        let text = pages_text(&[(
            1,
            "Same paragraph about caching policies here.\n\nSame paragraph about caching policies here.",
        )]);
        // Target small enough that each paragraph closes its own chunk.
        let chunks = chunker(5, 3, 40, 0).chunk(&text, "f1", &[]);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn max_size_closes_mid_paragraph() {
        let long: String = (0..30)
            .map(|i| format!("Word heavy sentence number {i} with extra padding tokens."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker(10, 3, 20, 0).chunk(&long, "f1", &[]);
        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.word_count() >= 3);
            assert!(chunk.word_count() <= 20);
        }
    }

    #[test]
    fn small_residual_merges_into_previous_chunk() {
        let text = "First sentence has exactly seven words inside.\n\nSecond sentence also has seven words total.\n\nTiny end.";
        let chunks = chunker(12, 6, 40, 0).chunk(text, "f1", &[]);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.ends_with("Tiny end."));
    }

    #[test]
    fn table_paragraph_sets_flags_and_type() {
        let text =
            "[TABLE_BEGIN]\nName | Qty | Price\nApple | 3 | 5\n[TABLE_END]\n\nProse afterwards continues the document.";
        let chunks = chunker(500, 3, 750, 0).chunk(text, "f1", &[]);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains_table);
        assert!(chunks[0].content.contains("[TABLO]"));
        assert_eq!(chunks[0].content_type, ContentType::Table);
    }

    #[test]
    fn list_paragraph_sets_list_flag() {
        let text = "Shopping list follows below today.\n\n- apples for the cake\n- pears for the salad\n- plums for the jam";
        let chunks = chunker(500, 3, 750, 0).chunk(text, "f1", &[]);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains_list);
    }

    #[test]
    fn images_attach_by_page_span() {
        let image_on_1 = ImageRef::new(Uuid::new_v4(), 1);
        let image_on_2 = ImageRef::new(Uuid::new_v4(), 2);
        let image_on_9 = ImageRef::new(Uuid::new_v4(), 9);

        let text = pages_text(&[
            (1, "# Bir\n\nFirst page prose sits here nicely."),
            (2, "# Iki\n\nSecond page prose follows along."),
        ]);
        let chunks = chunker(20, 3, 40, 0).chunk(
            &text,
            "f1",
            &[image_on_1.clone(), image_on_2.clone(), image_on_9],
        );

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].image_references.contains(&image_on_1.id));
        assert!(!chunks[0].image_references.contains(&image_on_2.id));
        assert!(chunks[1].image_references.contains(&image_on_2.id));
        for chunk in &chunks {
            for id in &chunk.image_references {
                assert_ne!(*id, Uuid::nil());
            }
        }
    }

    #[test]
    fn heading_closes_accumulated_chunk() {
        let text = "# One\n\nAlpha beta gamma delta epsilon zeta eta.\n\n# Two\n\nSecond section content goes here now.";
        let chunks = chunker(100, 5, 750, 2).chunk(text, "f1", &[]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title.as_deref(), Some("# One"));
        assert_eq!(chunks[1].section_title.as_deref(), Some("# Two"));
        assert_eq!(chunks[0].content_type, ContentType::Heading);
    }
}
