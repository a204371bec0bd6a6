//! Deck model: one framing slide followed by one slide per record.
//!
//! Building a [`Deck`] is pure and infallible. Every record becomes exactly
//! one slide in input order, whatever its content; empty cells produce empty
//! text blocks and oversized cells are truncated by [`fit_text`].

use crate::config::{ServiceConfig, TextCapacity};
use crate::model::Record;
use crate::pipeline::fit::fit_text;

/// 16:9 slide width in EMU (13.333 in).
pub const SLIDE_WIDTH_EMU: i64 = 12_192_000;
/// 16:9 slide height in EMU (7.5 in).
pub const SLIDE_HEIGHT_EMU: i64 = 6_858_000;

const MARGIN_EMU: i64 = 457_200;
const CONTENT_WIDTH_EMU: i64 = SLIDE_WIDTH_EMU - 2 * MARGIN_EMU;

/// Position and size of a text box, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    Title,
    Subtitle,
    Question,
    Answer,
}

impl BlockRole {
    /// Shape name written into the slide part.
    pub fn shape_name(&self) -> &'static str {
        match self {
            BlockRole::Title => "Title",
            BlockRole::Subtitle => "Subtitle",
            BlockRole::Question => "Question",
            BlockRole::Answer => "Answer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Middle,
}

/// Styled, positioned text on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub role: BlockRole,
    pub text: String,
    pub truncated: bool,
    pub frame: Frame,
    /// Font size in points.
    pub font_size: u32,
    pub bold: bool,
    pub align: Align,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Framing,
    /// Zero-based index of the source record.
    Record(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub kind: SlideKind,
    pub blocks: Vec<TextBlock>,
}

impl Slide {
    pub fn block(&self, role: BlockRole) -> Option<&TextBlock> {
        self.blocks.iter().find(|b| b.role == role)
    }
}

/// An ordered, fully laid-out presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Number of text blocks that were cut to fit.
    pub fn truncated_blocks(&self) -> usize {
        self.slides
            .iter()
            .flat_map(|s| s.blocks.iter())
            .filter(|b| b.truncated)
            .count()
    }
}

/// The subset of [`ServiceConfig`] that shapes a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckLayout {
    pub title: String,
    pub subtitle: String,
    pub question_capacity: TextCapacity,
    pub answer_capacity: TextCapacity,
}

impl DeckLayout {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            title: config.deck_title.clone(),
            subtitle: config.deck_subtitle.clone(),
            question_capacity: config.question_capacity,
            answer_capacity: config.answer_capacity,
        }
    }
}

impl Default for DeckLayout {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

/// Build the deck for `records`: framing slide first, then one slide per
/// record in input order.
pub fn build_deck(records: &[Record], layout: &DeckLayout) -> Deck {
    let mut slides = Vec::with_capacity(records.len() + 1);
    slides.push(framing_slide(layout));
    slides.extend(
        records
            .iter()
            .enumerate()
            .map(|(i, record)| record_slide(i, record, layout)),
    );
    Deck {
        title: layout.title.clone(),
        slides,
    }
}

fn framing_slide(layout: &DeckLayout) -> Slide {
    // The title is operator-supplied; it gets the question budget so a long
    // title cannot overflow either.
    let title = fit_text(&layout.title, layout.question_capacity);
    let mut blocks = vec![TextBlock {
        role: BlockRole::Title,
        text: title.text,
        truncated: title.truncated,
        frame: Frame {
            x: MARGIN_EMU,
            y: 2_130_425,
            cx: CONTENT_WIDTH_EMU,
            cy: 1_470_025,
        },
        font_size: 44,
        bold: true,
        align: Align::Center,
        anchor: Anchor::Middle,
    }];

    let subtitle = fit_text(&layout.subtitle, layout.question_capacity);
    if !subtitle.text.is_empty() {
        blocks.push(TextBlock {
            role: BlockRole::Subtitle,
            text: subtitle.text,
            truncated: subtitle.truncated,
            frame: Frame {
                x: MARGIN_EMU,
                y: 3_886_200,
                cx: CONTENT_WIDTH_EMU,
                cy: 1_066_800,
            },
            font_size: 24,
            bold: false,
            align: Align::Center,
            anchor: Anchor::Top,
        });
    }

    Slide {
        kind: SlideKind::Framing,
        blocks,
    }
}

fn record_slide(index: usize, record: &Record, layout: &DeckLayout) -> Slide {
    let question = fit_text(&record.question, layout.question_capacity);
    let answer = fit_text(&record.answer, layout.answer_capacity);

    Slide {
        kind: SlideKind::Record(index),
        blocks: vec![
            TextBlock {
                role: BlockRole::Question,
                text: question.text,
                truncated: question.truncated,
                frame: Frame {
                    x: MARGIN_EMU,
                    y: 365_125,
                    cx: CONTENT_WIDTH_EMU,
                    cy: 1_825_625,
                },
                font_size: 32,
                bold: true,
                align: Align::Left,
                anchor: Anchor::Middle,
            },
            TextBlock {
                role: BlockRole::Answer,
                text: answer.text,
                truncated: answer.truncated,
                frame: Frame {
                    x: MARGIN_EMU,
                    y: 2_286_000,
                    cx: CONTENT_WIDTH_EMU,
                    cy: 4_114_800,
                },
                font_size: 24,
                bold: false,
                align: Align::Left,
                anchor: Anchor::Top,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fit::ELLIPSIS;

    fn layout() -> DeckLayout {
        DeckLayout::default()
    }

    #[test]
    fn empty_records_yield_framing_slide_only() {
        let deck = build_deck(&[], &layout());
        assert_eq!(deck.slide_count(), 1);
        assert_eq!(deck.slides[0].kind, SlideKind::Framing);
        assert_eq!(
            deck.slides[0].block(BlockRole::Title).unwrap().text,
            "Questions & Answers"
        );
    }

    #[test]
    fn one_slide_per_record_in_order() {
        let records = vec![
            Record::new("Capital of France?", "Paris"),
            Record::new("2+2", "4"),
            Record::new("Capital of France?", "Paris"),
        ];
        let deck = build_deck(&records, &layout());
        assert_eq!(deck.slide_count(), records.len() + 1);

        for (i, record) in records.iter().enumerate() {
            let slide = &deck.slides[i + 1];
            assert_eq!(slide.kind, SlideKind::Record(i));
            assert_eq!(slide.block(BlockRole::Question).unwrap().text, record.question);
            assert_eq!(slide.block(BlockRole::Answer).unwrap().text, record.answer);
        }
    }

    #[test]
    fn empty_fields_render_empty_blocks() {
        let deck = build_deck(&[Record::new("", "")], &layout());
        let slide = &deck.slides[1];
        assert_eq!(slide.blocks.len(), 2);
        assert_eq!(slide.block(BlockRole::Question).unwrap().text, "");
        assert_eq!(slide.block(BlockRole::Answer).unwrap().text, "");
    }

    #[test]
    fn oversized_answer_is_truncated_not_dropped() {
        let long = "word ".repeat(1000);
        let deck = build_deck(&[Record::new("Q", long)], &layout());
        let answer = deck.slides[1].block(BlockRole::Answer).unwrap();
        assert!(answer.truncated);
        assert!(answer.text.ends_with(ELLIPSIS));
        assert!(answer.text.chars().count() <= layout().answer_capacity.max_chars);
        assert_eq!(deck.truncated_blocks(), 1);
    }

    #[test]
    fn subtitle_only_when_configured() {
        let deck = build_deck(&[], &layout());
        assert!(deck.slides[0].block(BlockRole::Subtitle).is_none());

        let with_sub = DeckLayout {
            subtitle: "Round 1".into(),
            ..layout()
        };
        let deck = build_deck(&[], &with_sub);
        assert_eq!(
            deck.slides[0].block(BlockRole::Subtitle).unwrap().text,
            "Round 1"
        );
    }

    #[test]
    fn frames_fit_on_slide() {
        let deck = build_deck(&[Record::new("q", "a")], &layout());
        for block in deck.slides.iter().flat_map(|s| &s.blocks) {
            let f = block.frame;
            assert!(f.x >= 0 && f.y >= 0);
            assert!(f.x + f.cx <= SLIDE_WIDTH_EMU, "{:?} too wide", block.role);
            assert!(f.y + f.cy <= SLIDE_HEIGHT_EMU, "{:?} too tall", block.role);
        }
    }

    #[test]
    fn same_input_same_deck() {
        let records = vec![Record::new("a\r\nb", "c\u{200B}d")];
        assert_eq!(build_deck(&records, &layout()), build_deck(&records, &layout()));
    }
}
