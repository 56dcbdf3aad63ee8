//! Reducers over traversal results.

use crate::errors::GraphSeqError;

pub trait SeqExt<T> {
    /// First element, if any.
    fn first_item(self) -> Option<T>;
    /// The single element; anything but exactly one is an error.
    fn only(self) -> Result<T, GraphSeqError>;
    /// `None` for an empty sequence, the element for one, an error for more.
    fn at_most_one(self) -> Result<Option<T>, GraphSeqError>;
}

impl<T> SeqExt<T> for Vec<T> {
    fn first_item(self) -> Option<T> {
        self.into_iter().next()
    }

    fn only(self) -> Result<T, GraphSeqError> {
        let found = self.len();
        match self.at_most_one()? {
            Some(item) => Ok(item),
            None => Err(GraphSeqError::Cardinality {
                expected: "exactly one",
                found,
            }),
        }
    }

    fn at_most_one(self) -> Result<Option<T>, GraphSeqError> {
        if self.len() > 1 {
            return Err(GraphSeqError::Cardinality {
                expected: "at most one",
                found: self.len(),
            });
        }
        Ok(self.into_iter().next())
    }
}
