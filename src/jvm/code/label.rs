use std::fmt;

/// Opaque label identifying a position in one [`super::InsnList`]
///
/// Labels are only meaningful within the list whose generator produced them.
/// When a list is spliced into another, its labels are renumbered into the
/// destination's label space.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Label(pub(crate) u32);

impl Label {
    /// Label for the start of the method
    pub const START: Label = Label(0);

    pub(crate) fn offset_by(self, base: u32) -> Label {
        Label(self.0 + base)
    }
}

/// Generates new labels
///
/// Cloning does not split the generator source - the cloned generator will
/// produce the same sequence of labels as the original.
#[derive(Clone, Debug, Default)]
pub struct LabelGenerator {
    next: u32,
}

impl LabelGenerator {
    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        let to_return = Label(self.next);
        self.next += 1;
        to_return
    }

    /// One past the highest label handed out so far
    pub fn watermark(&self) -> u32 {
        self.next
    }

    /// Reserve space for `count` foreign labels, returning the base they
    /// should be offset by
    pub(crate) fn absorb(&mut self, count: u32) -> u32 {
        let base = self.next;
        self.next += count;
        base
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}
