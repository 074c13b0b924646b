use {
    crate::rect::Region,
    std::{cell::RefCell, collections::VecDeque, rc::Rc},
};

/// The damage submitted with the most recent presents of an output.
///
/// Lets a backend that recycles its buffers repaint only what changed
/// since the returned back buffer was last filled.
pub struct DamageHistory {
    entries: RefCell<VecDeque<Rc<Region>>>,
    capacity: usize,
}

impl DamageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RefCell::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Records the damage of a successfully submitted frame. Entries must be
    /// added in presentation order.
    pub fn add(&self, damage: &Rc<Region>) {
        let entries = &mut *self.entries.borrow_mut();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(damage.clone());
    }

    /// Returns the region that must be repainted to bring a buffer that is
    /// `age` presents old up to date, that is the union of the last `age`
    /// entries. If the age is 0 or exceeds the stored history, the buffer
    /// content cannot be reconstructed and `full` is returned.
    pub fn accumulate(&self, age: usize, full: &Rc<Region>) -> Rc<Region> {
        let entries = &*self.entries.borrow();
        if age == 0 || age > entries.len() {
            return full.clone();
        }
        let mut res = Region::empty();
        for entry in entries.iter().rev().take(age) {
            res = res.union(entry);
        }
        res
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::rect::Rect,
    };

    fn region(x1: i32, y1: i32, x2: i32, y2: i32) -> Rc<Region> {
        Region::new(Rect::new(x1, y1, x2, y2).unwrap())
    }

    #[test]
    fn accumulate_is_union_of_last_entries() {
        let full = region(0, 0, 100, 100);
        let history = DamageHistory::new(4);
        let r1 = region(0, 0, 10, 10);
        let r2 = region(10, 0, 20, 10);
        let r3 = region(20, 0, 30, 10);
        history.add(&r1);
        history.add(&r2);
        history.add(&r3);
        assert_eq!(&*history.accumulate(1, &full), &*r3);
        assert_eq!(&*history.accumulate(2, &full), &*r2.union(&r3));
        assert_eq!(&*history.accumulate(3, &full), &*r1.union(&r2).union(&r3));
    }

    #[test]
    fn zero_and_excessive_age_return_full() {
        let full = region(0, 0, 100, 100);
        let history = DamageHistory::new(4);
        assert_eq!(&*history.accumulate(0, &full), &*full);
        assert_eq!(&*history.accumulate(1, &full), &*full);
        history.add(&region(0, 0, 10, 10));
        assert_eq!(&*history.accumulate(0, &full), &*full);
        assert_eq!(&*history.accumulate(2, &full), &*full);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let full = region(0, 0, 100, 100);
        let history = DamageHistory::new(4);
        let rs: Vec<_> = (0..6).map(|i| region(10 * i, 0, 10 * i + 10, 10)).collect();
        for r in &rs {
            history.add(r);
        }
        let expected = rs[2].union(&rs[3]).union(&rs[4]).union(&rs[5]);
        assert_eq!(&*history.accumulate(4, &full), &*expected);
        assert_eq!(&*history.accumulate(5, &full), &*full);
    }

    #[test]
    fn round_trip() {
        let full = region(0, 0, 100, 100);
        let history = DamageHistory::new(4);
        let r = region(3, 7, 55, 62);
        history.add(&r);
        assert_eq!(&*history.accumulate(1, &full), &*r);
    }

    #[test]
    fn clear_forgets_history() {
        let full = region(0, 0, 100, 100);
        let history = DamageHistory::new(4);
        history.add(&region(0, 0, 10, 10));
        history.clear();
        assert_eq!(&*history.accumulate(1, &full), &*full);
    }
}
