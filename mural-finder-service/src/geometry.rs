//! Bounding box aggregation for matched words.

use serde::Serialize;

use crate::db::Word;
use crate::error::{ServiceError, ServiceResult};

/// Axis-aligned rectangle in image pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rectangle {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Compute the smallest rectangle enclosing every word.
///
/// Fails with `InvalidInput` for an empty list or a word whose far edge does
/// not fit in pixel coordinates.
pub fn enclosing_box(words: &[Word]) -> ServiceResult<Rectangle> {
    let mut bounds: Option<Rectangle> = None;

    for word in words {
        let right = word.left.checked_add(word.width).ok_or_else(|| {
            ServiceError::invalid_input(format!(
                "word {:?} extends past the right edge",
                word.text
            ))
        })?;
        let bottom = word.top.checked_add(word.height).ok_or_else(|| {
            ServiceError::invalid_input(format!(
                "word {:?} extends past the bottom edge",
                word.text
            ))
        })?;

        bounds = Some(match bounds {
            Some(b) => Rectangle {
                left: b.left.min(word.left),
                top: b.top.min(word.top),
                right: b.right.max(right),
                bottom: b.bottom.max(bottom),
            },
            None => Rectangle {
                left: word.left,
                top: word.top,
                right,
                bottom,
            },
        });
    }

    bounds.ok_or_else(|| ServiceError::invalid_input("cannot enclose an empty word list"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word() {
        let rect = enclosing_box(&[Word::new("Hello", 10, 12, 50, 20)]).unwrap();
        assert_eq!(
            rect,
            Rectangle {
                left: 10,
                top: 12,
                right: 60,
                bottom: 32
            }
        );
        assert_eq!(rect.width(), 50);
        assert_eq!(rect.height(), 20);
    }

    #[test]
    fn test_two_words_on_one_line() {
        let rect = enclosing_box(&[
            Word::new("Hello", 10, 10, 50, 20),
            Word::new("World", 65, 10, 60, 20),
        ])
        .unwrap();
        assert_eq!(
            rect,
            Rectangle {
                left: 10,
                top: 10,
                right: 125,
                bottom: 30
            }
        );
    }

    #[test]
    fn test_order_independent() {
        let words = vec![
            Word::new("a", 40, 5, 10, 30),
            Word::new("b", 3, 50, 100, 4),
            Word::new("c", 20, 0, 5, 5),
            Word::new("d", 90, 12, 60, 60),
        ];
        let expected = enclosing_box(&words).unwrap();

        let mut reversed = words.clone();
        reversed.reverse();
        assert_eq!(enclosing_box(&reversed).unwrap(), expected);

        let mut rotated = words.clone();
        rotated.rotate_left(2);
        assert_eq!(enclosing_box(&rotated).unwrap(), expected);

        assert_eq!(
            expected,
            Rectangle {
                left: 3,
                top: 0,
                right: 150,
                bottom: 72
            }
        );
    }

    #[test]
    fn test_empty_is_invalid_input() {
        assert!(matches!(
            enclosing_box(&[]),
            Err(ServiceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_overflowing_word_is_invalid_input() {
        let err = enclosing_box(&[Word::new("wide", u32::MAX - 1, 0, 5, 5)]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));
    }
}
