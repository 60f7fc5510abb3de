use serde::Serialize;

/// Navigation failure for a card request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PagerError {
    #[error("invalid card index {index} (matches: {len})")]
    InvalidIndex { index: usize, len: usize },
}

/// One card of a multi-match disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub folder: String,
    pub index: usize,
    pub total: usize,
    /// Target index of the "previous" affordance, when there is one.
    pub prev: Option<usize>,
    /// Target index of the "next" affordance, when there is one.
    pub next: Option<usize>,
}

impl CardView {
    /// Human position, e.g. `2 / 5`.
    pub fn position(&self) -> String {
        format!("{} / {}", self.index + 1, self.total)
    }
}

/// Render the card at `index`.
///
/// Out-of-range indices are rejected rather than clamped, and navigation
/// never wraps around.
pub fn render(matches: &[String], index: usize) -> Result<CardView, PagerError> {
    let folder = matches.get(index).ok_or(PagerError::InvalidIndex {
        index,
        len: matches.len(),
    })?;

    Ok(CardView {
        folder: folder.clone(),
        index,
        total: matches.len(),
        prev: index.checked_sub(1),
        next: (index + 1 < matches.len()).then_some(index + 1),
    })
}

/// Validate a navigation or selection target without rendering.
pub fn check_index(matches: &[String], index: usize) -> Result<(), PagerError> {
    if index < matches.len() {
        Ok(())
    } else {
        Err(PagerError::InvalidIndex {
            index,
            len: matches.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn matches(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Base/G/Person_{i}")).collect()
    }

    #[test]
    fn first_card_has_no_prev() {
        let card = render(&matches(3), 0).unwrap();
        assert_eq!(card.prev, None);
        assert_eq!(card.next, Some(1));
        assert_eq!(card.position(), "1 / 3");
        assert_eq!(card.folder, "Base/G/Person_0");
    }

    #[test]
    fn last_card_has_no_next() {
        let card = render(&matches(3), 2).unwrap();
        assert_eq!(card.prev, Some(1));
        assert_eq!(card.next, None);
    }

    #[test]
    fn single_match_has_no_navigation() {
        let card = render(&matches(1), 0).unwrap();
        assert_eq!((card.prev, card.next), (None, None));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(
            render(&matches(2), 2),
            Err(PagerError::InvalidIndex { index: 2, len: 2 })
        );
        assert!(render(&[], 0).is_err());
        assert!(check_index(&matches(2), 5).is_err());
        assert!(check_index(&matches(2), 1).is_ok());
    }

    proptest! {
        #[test]
        fn affordances_stay_in_bounds(len in 1usize..50, index in 0usize..60) {
            let list = matches(len);
            match render(&list, index) {
                Ok(card) => {
                    prop_assert!(index < len);
                    prop_assert_eq!(card.prev.is_some(), index > 0);
                    prop_assert_eq!(card.next.is_some(), index < len - 1);
                    if let Some(prev) = card.prev {
                        prop_assert!(render(&list, prev).is_ok());
                    }
                    if let Some(next) = card.next {
                        prop_assert!(render(&list, next).is_ok());
                    }
                }
                Err(_) => prop_assert!(index >= len),
            }
        }
    }
}
