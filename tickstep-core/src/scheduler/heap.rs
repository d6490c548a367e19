//! Double-buffered step heap
//!
//! Scheduled steps live in two fixed arrays ("halves"). Each period the
//! planner bump-allocates a fresh time-ordered list in the current half
//! while the dispatcher walks the list in the other half. At the period
//! boundary the dispatcher takes the freshly built list
//! ([`StepHeap::take_pending`]), the planner fills the half the
//! dispatcher just finished, and the halves swap ([`StepHeap::switch`]).
//!
//! Lists are linked by index, so a swap is an integer toggle and entries
//! are never freed individually: a half is recycled wholesale two
//! periods after it was filled.
//!
//! The planner side only ever holds a [`StepWriter`], which borrows the
//! current half; the dispatcher side only holds [`StepRef`] cursors into
//! the other half. Handing a list over is a single `take_pending` call
//! in program order, with no locking.

use crate::motion::{Direction, PowerLevel};

/// Default capacity of each half
pub const STEP_HEAP_SIZE: usize = 65;

/// Index of a step inside one half
pub type StepIndex = u16;

/// A scheduled step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStep {
    /// Next step in time order (same half)
    next: Option<StepIndex>,
    /// Axis the step belongs to
    pub axis: u8,
    /// Tick within the period at which the step is due
    pub time: u32,
    /// Phase direction
    pub direction: Direction,
    /// Phase table to use
    pub power: PowerLevel,
}

impl TimerStep {
    const EMPTY: Self = Self {
        next: None,
        axis: 0,
        time: 0,
        direction: Direction::Forward,
        power: PowerLevel::Hold,
    };
}

/// Dispatcher-side cursor to a step in one half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRef {
    half: u8,
    index: StepIndex,
}

/// Insertion point in the list being built
///
/// `Head` is the list head; `Next(i)` is the link after step `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Before the first step
    Head,
    /// After the given step
    Next(StepIndex),
}

/// Two fixed-capacity halves of scheduled steps
#[derive(Debug)]
pub struct StepHeap<const N: usize> {
    halves: [[TimerStep; N]; 2],
    /// Half the planner writes into
    current: usize,
    /// Next free slot in the current half
    pos: usize,
    /// Head of the list built for the next period
    steps: Option<StepRef>,
    /// Insertions dropped because the current half was full
    dropped: u32,
}

impl<const N: usize> Default for StepHeap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StepHeap<N> {
    const INDEX_FITS: () = assert!(N <= StepIndex::MAX as usize + 1, "step heap too large");

    /// Create an empty heap
    pub const fn new() -> Self {
        let () = Self::INDEX_FITS;
        Self {
            halves: [[TimerStep::EMPTY; N]; 2],
            current: 0,
            pos: 0,
            steps: None,
            dropped: 0,
        }
    }

    /// Capacity of each half
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Half the planner writes into
    pub fn current_heap(&self) -> usize {
        self.current
    }

    /// Slots used in the current half
    pub fn heap_pos(&self) -> usize {
        self.pos
    }

    /// Insertions dropped since creation
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Planner access to the list being built
    pub fn writer(&mut self) -> StepWriter<'_, N> {
        let half = self.current;
        debug_assert!(
            self.steps.map_or(true, |r| r.half as usize == half),
            "pending list must be taken before planning into a new half"
        );
        let [first, second] = &mut self.halves;
        let slots = if half == 0 { first } else { second };
        StepWriter {
            slots,
            half: half as u8,
            pos: &mut self.pos,
            head: &mut self.steps,
            dropped: &mut self.dropped,
        }
    }

    /// Swap halves and reset the bump cursor
    pub fn switch(&mut self) {
        self.current ^= 1;
        self.pos = 0;
    }

    /// Hand the list built for the next period to the dispatcher
    pub fn take_pending(&mut self) -> Option<StepRef> {
        self.steps.take()
    }

    /// Step behind a cursor
    pub fn get(&self, at: StepRef) -> &TimerStep {
        &self.halves[at.half as usize][at.index as usize]
    }

    /// Cursor to the step following `at`
    pub fn next(&self, at: StepRef) -> Option<StepRef> {
        self.get(at).next.map(|index| StepRef {
            half: at.half,
            index,
        })
    }

    /// Iterate a list starting at `start`
    pub fn iter_from(&self, start: Option<StepRef>) -> Iter<'_, N> {
        Iter {
            heap: self,
            cursor: start,
        }
    }

    /// Iterate the list built for the next period
    pub fn pending_iter(&self) -> Iter<'_, N> {
        self.iter_from(self.steps)
    }
}

/// Iterator over a step list
pub struct Iter<'a, const N: usize> {
    heap: &'a StepHeap<N>,
    cursor: Option<StepRef>,
}

impl<'a, const N: usize> Iterator for Iter<'a, N> {
    type Item = &'a TimerStep;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.cursor?;
        self.cursor = self.heap.next(at);
        Some(self.heap.get(at))
    }
}

/// Planner handle on the current half
pub struct StepWriter<'a, const N: usize> {
    slots: &'a mut [TimerStep; N],
    half: u8,
    pos: &'a mut usize,
    head: &'a mut Option<StepRef>,
    dropped: &'a mut u32,
}

impl<const N: usize> StepWriter<'_, N> {
    /// Insert a step, keeping the list in non-decreasing time order
    ///
    /// Scans forward from `at`; passing back the returned link for the
    /// next, later step of the same axis makes insertion amortised O(1).
    /// Steps with equal times keep insertion order. If the half is full
    /// the step is dropped, counted, and `at` is returned unchanged.
    pub fn insert_step(
        &mut self,
        at: Link,
        axis: u8,
        time: u32,
        direction: Direction,
        power: PowerLevel,
    ) -> Link {
        let mut at = at;
        if let Link::Next(i) = at {
            // Stale or overtaken cursor: rescan from the head
            if i as usize >= *self.pos || self.slots[i as usize].time > time {
                at = Link::Head;
            }
        }
        while let Some(i) = self.link(at) {
            if self.slots[i as usize].time > time {
                break;
            }
            at = Link::Next(i);
        }

        if *self.pos >= N {
            *self.dropped = self.dropped.saturating_add(1);
            return at;
        }
        let index = *self.pos as StepIndex;
        *self.pos += 1;

        self.slots[index as usize] = TimerStep {
            next: self.link(at),
            axis,
            time,
            direction,
            power,
        };
        self.set_link(at, index);
        Link::Next(index)
    }

    /// Steps allocated in this half so far
    pub fn len(&self) -> usize {
        *self.pos
    }

    /// Check whether nothing has been allocated yet
    pub fn is_empty(&self) -> bool {
        *self.pos == 0
    }

    fn link(&self, at: Link) -> Option<StepIndex> {
        match at {
            Link::Head => self.head.map(|r| r.index),
            Link::Next(i) => self.slots[i as usize].next,
        }
    }

    fn set_link(&mut self, at: Link, index: StepIndex) {
        match at {
            Link::Head => {
                *self.head = Some(StepRef {
                    half: self.half,
                    index,
                })
            }
            Link::Next(i) => self.slots[i as usize].next = Some(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn insert<const N: usize>(heap: &mut StepHeap<N>, at: Link, axis: u8, time: u32) -> Link {
        heap.writer()
            .insert_step(at, axis, time, Direction::Forward, PowerLevel::Run)
    }

    fn times<const N: usize>(heap: &StepHeap<N>) -> heapless::Vec<u32, 128> {
        heap.pending_iter().map(|s| s.time).collect()
    }

    #[test]
    fn test_interleaved_axes_stay_sorted() {
        let mut heap = StepHeap::<16>::new();
        let mut a = Link::Head;
        for t in [10, 30, 50] {
            a = insert(&mut heap, a, 0, t);
        }
        let mut b = Link::Head;
        for t in [5, 30, 40, 60] {
            b = insert(&mut heap, b, 1, t);
        }
        assert_eq!(times(&heap).as_slice(), &[5, 10, 30, 30, 40, 50, 60]);

        // Equal times keep insertion order: axis 0 was first at 30
        let axes: heapless::Vec<u8, 16> = heap.pending_iter().map(|s| s.axis).collect();
        assert_eq!(axes.as_slice(), &[1, 0, 0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_overtaken_cursor_rescans() {
        let mut heap = StepHeap::<8>::new();
        let late = insert(&mut heap, Link::Head, 0, 100);
        insert(&mut heap, late, 1, 20);
        assert_eq!(times(&heap).as_slice(), &[20, 100]);
    }

    #[test]
    fn test_exhaustion_drops_silently() {
        let mut heap = StepHeap::<4>::new();
        let mut at = Link::Head;
        for t in 0..10 {
            at = insert(&mut heap, at, 0, t * 10);
        }
        assert_eq!(heap.heap_pos(), 4);
        assert_eq!(heap.dropped(), 6);
        assert_eq!(times(&heap).as_slice(), &[0, 10, 20, 30]);
    }

    #[test]
    fn test_switch_resets_cursor() {
        let mut heap = StepHeap::<4>::new();
        insert(&mut heap, Link::Head, 0, 1);
        assert_eq!(heap.current_heap(), 0);
        heap.switch();
        assert_eq!(heap.current_heap(), 1);
        assert_eq!(heap.heap_pos(), 0);
        heap.switch();
        assert_eq!(heap.current_heap(), 0);
        assert_eq!(heap.heap_pos(), 0);
    }

    #[test]
    fn test_handoff_keeps_list_readable() {
        let mut heap = StepHeap::<4>::new();
        let at = insert(&mut heap, Link::Head, 0, 7);
        insert(&mut heap, at, 0, 9);
        heap.switch();

        let head = heap.take_pending();
        assert!(heap.pending_iter().next().is_none());

        // Planner fills the other half while the taken list is walked
        insert(&mut heap, Link::Head, 0, 1);
        let walked: heapless::Vec<u32, 4> = heap.iter_from(head).map(|s| s.time).collect();
        assert_eq!(walked.as_slice(), &[7, 9]);
        assert_eq!(times(&heap).as_slice(), &[1]);
    }

    proptest! {
        #[test]
        fn prop_sorted_after_every_insert(
            ops in proptest::collection::vec((0u8..4, 0u32..6000, any::<bool>()), 0..120)
        ) {
            let mut heap = StepHeap::<65>::new();
            let mut cursors = [Link::Head; 4];
            for (axis, time, reuse) in ops {
                let at = if reuse { cursors[axis as usize] } else { Link::Head };
                cursors[axis as usize] = insert(&mut heap, at, axis, time);
                let t = times(&heap);
                prop_assert!(t.windows(2).all(|w| w[0] <= w[1]));
                prop_assert!(heap.heap_pos() <= heap.capacity());
            }
        }

        #[test]
        fn prop_exhaustion_keeps_prefix(
            mut times_in in proptest::collection::vec(0u32..6000, 1..40)
        ) {
            let mut heap = StepHeap::<8>::new();
            let mut at = Link::Head;
            times_in.sort_unstable();
            for &t in &times_in {
                at = insert(&mut heap, at, 0, t);
            }
            let kept = times_in.len().min(8);
            let got = times(&heap);
            prop_assert_eq!(got.as_slice(), &times_in[..kept]);
            prop_assert_eq!(heap.dropped() as usize, times_in.len() - kept);
        }
    }
}
