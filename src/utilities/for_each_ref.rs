/// Defines a loop body function able to stop the enclosing traversal early.
pub trait IBreakableForEach<T> {
    /// Executes one execution of the loop body.
    ///
    /// # Arguments
    ///
    /// * `i` - Visited element.
    ///
    /// # Returns
    ///
    /// True if the loop should continue, false otherwise.
    fn loop_body(&mut self, i: T) -> bool;
}

impl<T, F> IBreakableForEach<T> for F
where
    F: FnMut(T) -> bool,
{
    #[inline(always)]
    fn loop_body(&mut self, i: T) -> bool {
        self(i)
    }
}
