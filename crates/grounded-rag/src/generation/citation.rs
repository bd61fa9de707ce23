//! Citation trailer built from retrieved documents

use crate::types::RetrievedMatch;

/// First line of every citation block
pub const CITATION_HEADER: &str = "Sources:";

/// One provenance line per match, in rank order
///
/// Matches that share a provenance, such as several rows stored under one
/// name, collapse into the line of the best-ranked one.
pub fn citation_block(matches: &[RetrievedMatch]) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(matches.len());
    for m in matches {
        let src = m.metadata.provenance();
        if !lines.contains(&src) {
            lines.push(src);
        }
    }

    let mut block = String::from(CITATION_HEADER);
    for line in lines {
        block.push('\n');
        block.push_str(line);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    fn hit(src: &str) -> RetrievedMatch {
        RetrievedMatch {
            id: src.to_string(),
            name: src.to_string(),
            text: String::new(),
            metadata: DocumentMetadata::new(src),
            embedding: vec![],
            score: 0.0,
        }
    }

    #[test]
    fn test_block_dedupes_in_rank_order() {
        let block = citation_block(&[hit("b.pdf"), hit("a.txt"), hit("b.pdf")]);
        assert_eq!(block, "Sources:\nb.pdf\na.txt");
    }

    #[test]
    fn test_empty_block_is_header_only() {
        assert_eq!(citation_block(&[]), CITATION_HEADER);
    }
}
