//! Test helpers shared by the engine, observer and shell tests.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// A waker that does nothing when woken.
pub fn noop_waker() -> Waker {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    unsafe { Waker::from_raw(noop_raw_waker()) }
}

/// Poll a pinned future exactly once.
pub fn poll_once<F: Future>(f: Pin<&mut F>) -> Poll<F::Output> {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    f.poll(&mut cx)
}

/// Run a future to completion (simple blocking executor).
///
/// Every future in these tests resolves without suspending, so `Pending`
/// is treated as a test failure.
pub fn block_on<F: Future>(mut f: F) -> F::Output {
    // SAFETY: We don't move f after pinning
    let f = unsafe { Pin::new_unchecked(&mut f) };

    match poll_once(f) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("future returned Pending unexpectedly"),
    }
}
