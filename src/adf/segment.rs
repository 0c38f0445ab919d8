use lazy_static::lazy_static;
use regex::Regex;

use super::inline;
use super::{Block, Document, ListItem};

/// Block segmenter: one forward pass over the input lines, classifying each
/// into a block-level construct and delegating non-code text to the inline
/// formatter.

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.+)$").unwrap();
    static ref BULLET: Regex = Regex::new(r"^[-*•]\s+(.+)$").unwrap();
    static ref ORDERED: Regex = Regex::new(r"^\d+\.\s+(.+)$").unwrap();
}

/// Split `text` into blocks. Total over all inputs; the resulting document
/// always holds at least one block, and block order matches line order.
pub fn segment(text: &str) -> Document {
    let mut blocks: Vec<Block> = Vec::new();
    let mut in_code_block = false;
    let mut code_lines: Vec<&str> = Vec::new();
    let mut code_language = String::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            if in_code_block {
                blocks.push(flush_code_block(&mut code_lines, &mut code_language));
            } else {
                code_language = trimmed[3..].trim().to_string();
            }
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            // Everything inside a fence is verbatim, heading and list syntax
            // included.
            code_lines.push(line);
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
            let rest = caps.get(2).map_or("", |m| m.as_str());
            blocks.push(Block::Heading {
                level,
                inline: inline::format(rest),
            });
            continue;
        }

        if let Some(caps) = BULLET.captures(line) {
            let item = ListItem {
                inline: inline::format(caps.get(1).map_or("", |m| m.as_str())),
            };
            // Bullet runs must be contiguous: append to the previous block
            // only when it is itself a bullet list.
            match blocks.last_mut() {
                Some(Block::BulletList { items }) => items.push(item),
                _ => blocks.push(Block::BulletList { items: vec![item] }),
            }
            continue;
        }

        if let Some(caps) = ORDERED.captures(line) {
            let item = ListItem {
                inline: inline::format(caps.get(1).map_or("", |m| m.as_str())),
            };
            match blocks.last_mut() {
                Some(Block::OrderedList { items }) => items.push(item),
                _ => blocks.push(Block::OrderedList { items: vec![item] }),
            }
            continue;
        }

        blocks.push(Block::Paragraph {
            inline: inline::format(line),
        });
    }

    // An unterminated fence still flushes what it collected.
    if in_code_block {
        blocks.push(flush_code_block(&mut code_lines, &mut code_language));
    }

    if blocks.is_empty() {
        blocks.push(Block::Paragraph { inline: Vec::new() });
    }

    Document { content: blocks }
}

fn flush_code_block(code_lines: &mut Vec<&str>, code_language: &mut String) -> Block {
    let raw_text = code_lines.join("\n");
    code_lines.clear();
    let language = if code_language.is_empty() {
        None
    } else {
        Some(std::mem::take(code_language))
    };
    Block::CodeBlock { language, raw_text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adf::{InlineRun, Mark};

    fn paragraph_text(block: &Block) -> String {
        match block {
            Block::Paragraph { inline } => {
                inline.iter().map(|run| run.text.as_str()).collect()
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_heading_level_one() {
        let doc = segment("# Title");
        assert_eq!(doc.content, vec![Block::Heading {
            level: 1,
            inline: vec![InlineRun::plain("Title")],
        }]);
    }

    #[test]
    fn test_heading_with_inline_markup() {
        let doc = segment("## Sub *em* and **strong**");
        assert_eq!(doc.content, vec![Block::Heading {
            level: 2,
            inline: vec![
                InlineRun::plain("Sub "),
                InlineRun::marked("em", Mark::Emphasis),
                InlineRun::plain(" and "),
                InlineRun::marked("strong", Mark::Strong),
            ],
        }]);
    }

    #[test]
    fn test_seven_hashes_is_a_paragraph() {
        let doc = segment("####### too deep");
        assert_eq!(paragraph_text(&doc.content[0]), "####### too deep");
    }

    #[test]
    fn test_hash_without_space_is_a_paragraph() {
        let doc = segment("#tag");
        assert_eq!(paragraph_text(&doc.content[0]), "#tag");
    }

    #[test]
    fn test_contiguous_bullets_group_into_one_list() {
        let doc = segment("- one\n- two");
        assert_eq!(doc.content, vec![Block::BulletList {
            items: vec![
                ListItem {
                    inline: vec![InlineRun::plain("one")]
                },
                ListItem {
                    inline: vec![InlineRun::plain("two")]
                },
            ],
        }]);
    }

    #[test]
    fn test_all_bullet_markers_accepted() {
        let doc = segment("- a\n* b\n• c");
        match &doc.content[0] {
            Block::BulletList { items } => assert_eq!(items.len(), 3),
            other => panic!("expected bullet list, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_breaks_list_grouping() {
        // A blank line is invisible elsewhere but still interrupts the
        // contiguous-run rule, producing two separate lists.
        let doc = segment("- one\n\n- two");
        assert_eq!(doc.content.len(), 2);
        assert!(matches!(doc.content[0], Block::BulletList { .. }));
        assert!(matches!(doc.content[1], Block::BulletList { .. }));
    }

    #[test]
    fn test_paragraph_breaks_list_grouping() {
        let doc = segment("- one\ntext\n- two");
        assert_eq!(doc.content.len(), 3);
        assert!(matches!(doc.content[0], Block::BulletList { .. }));
        assert!(matches!(doc.content[1], Block::Paragraph { .. }));
        assert!(matches!(doc.content[2], Block::BulletList { .. }));
    }

    #[test]
    fn test_ordered_list_grouping() {
        let doc = segment("1. first\n2. second\n10. tenth");
        assert_eq!(doc.content, vec![Block::OrderedList {
            items: vec![
                ListItem {
                    inline: vec![InlineRun::plain("first")]
                },
                ListItem {
                    inline: vec![InlineRun::plain("second")]
                },
                ListItem {
                    inline: vec![InlineRun::plain("tenth")]
                },
            ],
        }]);
    }

    #[test]
    fn test_ordered_and_bullet_do_not_merge() {
        let doc = segment("1. first\n- bullet");
        assert_eq!(doc.content.len(), 2);
        assert!(matches!(doc.content[0], Block::OrderedList { .. }));
        assert!(matches!(doc.content[1], Block::BulletList { .. }));
    }

    #[test]
    fn test_fenced_code_block_with_language() {
        let doc = segment("```js\ncode here\n```");
        assert_eq!(doc.content, vec![Block::CodeBlock {
            language: Some("js".to_string()),
            raw_text: "code here".to_string(),
        }]);
    }

    #[test]
    fn test_fence_lines_emit_no_paragraphs() {
        let doc = segment("before\n```\nx\n```\nafter");
        assert_eq!(doc.content.len(), 3);
        assert_eq!(paragraph_text(&doc.content[0]), "before");
        assert!(matches!(doc.content[1], Block::CodeBlock { .. }));
        assert_eq!(paragraph_text(&doc.content[2]), "after");
    }

    #[test]
    fn test_code_content_is_never_inline_formatted() {
        let doc = segment("```\n# not a heading\n- not a bullet\n**raw**\n```");
        assert_eq!(doc.content, vec![Block::CodeBlock {
            language: None,
            raw_text: "# not a heading\n- not a bullet\n**raw**".to_string(),
        }]);
    }

    #[test]
    fn test_unterminated_fence_still_flushes() {
        let doc = segment("```rust\nlet x = 1;\nlet y = 2;");
        assert_eq!(doc.content, vec![Block::CodeBlock {
            language: Some("rust".to_string()),
            raw_text: "let x = 1;\nlet y = 2;".to_string(),
        }]);
    }

    #[test]
    fn test_empty_input_yields_empty_paragraph() {
        assert_eq!(segment("").content, vec![Block::Paragraph {
            inline: Vec::new()
        }]);
    }

    #[test]
    fn test_whitespace_only_input_yields_empty_paragraph() {
        assert_eq!(segment("   \n\t\n  ").content, vec![Block::Paragraph {
            inline: Vec::new()
        }]);
    }

    #[test]
    fn test_consecutive_blank_lines_collapse() {
        let doc = segment("a\n\n\n\nb");
        assert_eq!(doc.content.len(), 2);
        assert_eq!(paragraph_text(&doc.content[0]), "a");
        assert_eq!(paragraph_text(&doc.content[1]), "b");
    }

    #[test]
    fn test_block_order_matches_line_order() {
        let doc = segment("# h\npara\n- item\n1. num\n```\nc\n```");
        assert!(matches!(doc.content[0], Block::Heading { .. }));
        assert!(matches!(doc.content[1], Block::Paragraph { .. }));
        assert!(matches!(doc.content[2], Block::BulletList { .. }));
        assert!(matches!(doc.content[3], Block::OrderedList { .. }));
        assert!(matches!(doc.content[4], Block::CodeBlock { .. }));
    }

    #[test]
    fn test_second_fence_starts_a_new_block() {
        let doc = segment("```\na\n```\n```\nb\n```");
        assert_eq!(doc.content.len(), 2);
    }

    #[test]
    fn test_indented_fence_marker_toggles() {
        let doc = segment("  ```py\nx = 1\n  ```");
        assert_eq!(doc.content, vec![Block::CodeBlock {
            language: Some("py".to_string()),
            raw_text: "x = 1".to_string(),
        }]);
    }
}
