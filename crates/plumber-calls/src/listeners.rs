//! Ordered listener lists with panic isolation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use plumber_protocol::OperationId;

use crate::FaultPolicy;

/// An insertion-ordered list of callbacks. Duplicates are allowed: a
/// callback added twice runs twice.
///
/// `F` is the unsized callback type, e.g. `dyn Fn(&CallInfo, &A) + Send + Sync`.
pub(crate) struct ListenerList<F: ?Sized> {
    entries: Mutex<Vec<Arc<F>>>,
}

impl<F: ?Sized> ListenerList<F> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, listener: Arc<F>) {
        self.lock().push(listener);
    }

    /// Clears the list and adds `listener` as its only entry.
    pub(crate) fn replace(&self, listener: Arc<F>) {
        let mut entries = self.lock();
        entries.clear();
        entries.push(listener);
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Calls `call` once per listener, in insertion order, and returns how
    /// many listeners ran.
    ///
    /// The list is copied before the first call, so a listener may add or
    /// clear listeners without deadlocking. Those changes apply from the
    /// next fan-out on.
    pub(crate) fn fan_out(
        &self,
        policy: FaultPolicy,
        operation: OperationId,
        mut call: impl FnMut(&F),
    ) -> usize {
        let snapshot: Vec<Arc<F>> = self.lock().clone();

        for (position, listener) in snapshot.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&**listener)));
            if let Err(payload) = outcome {
                tracing::error!(
                    %operation,
                    position,
                    panic = panic_message(payload.as_ref()),
                    "listener panicked"
                );
                if policy == FaultPolicy::Propagate {
                    panic::resume_unwind(payload);
                }
            }
        }
        snapshot.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<F>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    type Callback = dyn Fn(&mut Vec<u32>) + Send + Sync;

    fn run(list: &ListenerList<Callback>, policy: FaultPolicy) -> (usize, Vec<u32>) {
        let seen = Mutex::new(Vec::new());
        let ran = list.fan_out(policy, OperationId(1), |listener| {
            let mut out = Vec::new();
            listener(&mut out);
            seen.lock().unwrap().extend(out);
        });
        (ran, seen.into_inner().unwrap())
    }

    fn boom(_: &mut Vec<u32>) {
        panic!("boom");
    }

    fn pushing(n: u32) -> Arc<Callback> {
        Arc::new(move |out: &mut Vec<u32>| out.push(n))
    }

    #[test]
    fn test_fan_out_runs_in_insertion_order() {
        let list = ListenerList::<Callback>::new();
        list.push(pushing(1));
        list.push(pushing(2));
        list.push(pushing(3));

        assert_eq!(run(&list, FaultPolicy::Continue), (3, vec![1, 2, 3]));
    }

    #[test]
    fn test_duplicate_listener_runs_twice() {
        let list = ListenerList::<Callback>::new();
        let listener = pushing(5);
        list.push(Arc::clone(&listener));
        list.push(listener);

        assert_eq!(run(&list, FaultPolicy::Continue), (2, vec![5, 5]));
    }

    #[test]
    fn test_replace_leaves_single_listener() {
        let list = ListenerList::<Callback>::new();
        list.push(pushing(1));
        list.push(pushing(2));
        list.replace(pushing(9));

        assert_eq!(list.len(), 1);
        assert_eq!(run(&list, FaultPolicy::Continue), (1, vec![9]));

        list.clear();
        assert_eq!(run(&list, FaultPolicy::Continue), (0, vec![]));
    }

    #[test]
    fn test_fan_out_continue_isolates_panicking_listener() {
        let list = ListenerList::<Callback>::new();
        list.push(pushing(1));
        list.push(Arc::new(boom));
        list.push(pushing(3));

        assert_eq!(run(&list, FaultPolicy::Continue), (3, vec![1, 3]));
    }

    #[test]
    fn test_fan_out_propagate_resumes_panic() {
        let list = ListenerList::<Callback>::new();
        list.push(Arc::new(boom));
        list.push(pushing(2));

        let result = panic::catch_unwind(AssertUnwindSafe(|| run(&list, FaultPolicy::Propagate)));
        assert!(result.is_err());
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
