#![forbid(unsafe_code)]

//! Per-key cache cell: the last observed raw string and its decoded value.
//!
//! One cell per binding, owned by that binding alone and mutated only by
//! the read path. The decoded value sits behind `Rc` so that an unchanged
//! raw string yields the *same* allocation on every snapshot — consumers
//! relying on referential stability see no spurious change.

use std::rc::Rc;

pub(crate) struct CacheCell<T> {
    /// Raw string in effect when `decoded` was computed. `None` mirrors
    /// "key not present in backend".
    raw: Option<String>,
    decoded: Rc<T>,
    /// Whether a snapshot has been computed since this cell was armed.
    primed: bool,
}

impl<T> CacheCell<T> {
    pub(crate) fn new(default: Rc<T>) -> Self {
        Self {
            raw: None,
            decoded: default,
            primed: false,
        }
    }

    /// Whether `raw` matches the last observation, making the cached
    /// decoded value reusable as-is.
    pub(crate) fn is_fresh(&self, raw: &Option<String>) -> bool {
        self.primed && self.raw == *raw
    }

    pub(crate) fn primed(&self) -> bool {
        self.primed
    }

    pub(crate) fn decoded(&self) -> Rc<T> {
        Rc::clone(&self.decoded)
    }

    /// Record a freshly computed raw/decoded pair.
    pub(crate) fn commit(&mut self, raw: Option<String>, decoded: Rc<T>) {
        self.raw = raw;
        self.decoded = decoded;
        self.primed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprimed_cell_is_never_fresh() {
        let cell = CacheCell::new(Rc::new(0));
        assert!(!cell.is_fresh(&None));
        assert!(!cell.is_fresh(&Some("0".to_owned())));
    }

    #[test]
    fn commit_primes_and_matches_raw() {
        let mut cell = CacheCell::new(Rc::new(0));
        cell.commit(Some("5".to_owned()), Rc::new(5));
        assert!(cell.primed());
        assert!(cell.is_fresh(&Some("5".to_owned())));
        assert!(!cell.is_fresh(&Some("6".to_owned())));
        assert!(!cell.is_fresh(&None));
        assert_eq!(*cell.decoded(), 5);
    }

    #[test]
    fn decoded_is_reference_stable() {
        let mut cell = CacheCell::new(Rc::new(1));
        let value = Rc::new(2);
        cell.commit(Some("2".to_owned()), Rc::clone(&value));
        assert!(Rc::ptr_eq(&cell.decoded(), &value));
        assert!(Rc::ptr_eq(&cell.decoded(), &cell.decoded()));
    }

    #[test]
    fn absent_raw_is_a_distinct_observation() {
        let mut cell = CacheCell::new(Rc::new(0));
        cell.commit(None, Rc::new(0));
        assert!(cell.is_fresh(&None));
        assert!(!cell.is_fresh(&Some(String::new())));
    }
}
