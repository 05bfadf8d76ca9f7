/// Elements with a width, measured in JVM variable/stack slots
///
/// Class files count several things in terms of slots instead of element
/// counts: local variables, operand stack entries, and method arguments all
/// take one slot, except for `long` and `double` which take two.
pub trait Width {
    fn width(&self) -> usize;
}

impl<T: Width> Width for Option<T> {
    fn width(&self) -> usize {
        self.as_ref().map_or(0, Width::width)
    }
}

impl<T: Width> Width for Vec<T> {
    fn width(&self) -> usize {
        self.iter().map(Width::width).sum()
    }
}
