use crate::Vec;

/// Operand stack with its maximum size enforced in debug builds.
///
/// The bound comes from the `max_stack_size` the builder computed, so
/// exceeding it means the code and its metadata disagree.
///
/// ```ignore
/// let mut stack = Stack::new(2);
/// stack.push(42);
/// stack.push(17);
/// assert_eq!(stack.pop(), Some(17));
/// assert_eq!(stack.peek(), Some(&42));
/// ```
#[derive(Debug)]
pub struct Stack<T> {
    items: Vec<T>,
    /// Maximum allowed stack size (enforced in debug mode only).
    max_size: usize,
}

impl<T> Stack<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: Vec::with_capacity(max_size.min(256)),
            max_size,
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(
            self.items.len() < self.max_size,
            "Stack overflow: attempted to push beyond maximum size of {}",
            self.max_size
        );
        self.items.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Remove the top `n` values, returning them in push order.
    pub fn pop_n(&mut self, n: usize) -> Option<Vec<T>> {
        if n > self.items.len() {
            return None;
        }
        Some(self.items.split_off(self.items.len() - n))
    }
}
