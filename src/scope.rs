//! Nested logical operations used to correlate related entries.
//!
//! Each thread keeps its own stack of operation names. Entering an operation
//! returns a guard that pops the name when dropped, so scopes unwind with
//! normal control flow. The `log` adapter reads the stack to fill the `Path`
//! field; `tracing` users get the same effect from spans instead.

use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static OPERATIONS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Guard for an active logical operation. Not `Send`: the operation belongs
/// to the thread that started it.
#[must_use = "the operation ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LogicalOperation {
    depth: usize,
    _thread_bound: PhantomData<*const ()>,
}

impl LogicalOperation {
    /// Push `name` onto the calling thread's operation stack.
    pub fn start(name: impl Into<String>) -> Self {
        let name = name.into();
        let depth = OPERATIONS.with(|ops| {
            let mut ops = ops.borrow_mut();
            ops.push(name);
            ops.len()
        });
        Self {
            depth,
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for LogicalOperation {
    fn drop(&mut self) {
        OPERATIONS.with(|ops| {
            // Truncating also discards inner operations leaked with
            // `mem::forget`.
            ops.borrow_mut().truncate(self.depth - 1);
        });
    }
}

/// Snapshot of the calling thread's operation stack, outermost first.
pub fn current_stack() -> Vec<String> {
    OPERATIONS.with(|ops| ops.borrow().clone())
}
