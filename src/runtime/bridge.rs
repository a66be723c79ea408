/*!
 * Callback Bridge
 *
 * Lets a native callback running on a foreign thread deposit converted
 * items into a collection owned by the thread waiting on the native call.
 *
 * The waiting thread owns the `Accumulator` (the receiving end). The bridge
 * holds the sending end and only sends after it has acquired the execution
 * lock, so items are produced under the same single-writer rule as every
 * other piece of managed state.
 */

use super::lock::Runtime;
use crate::core::errors::{NativeResult, VixError, VixResult};
use crate::native::api::{EventCallback, NativeApi, NativeEvent};
use crate::native::constants::{VIX_EVENTTYPE_FIND_ITEM, VIX_PROPERTY_FOUND_ITEM_LOCATION};
use crate::native::property::extract_property;
use flume::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts one native event into a managed value; runs under the lock
pub type Converter<T> = Arc<dyn Fn(&dyn NativeApi, NativeEvent) -> VixResult<T> + Send + Sync>;

/// Shape of the collection the waiting thread expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorShape {
    /// Any number of items
    List,
    /// Exactly this many items
    Tuple(usize),
}

/// Receiving end, owned by the thread that waits on the native call
#[derive(Debug)]
pub struct Accumulator<T> {
    receiver: Receiver<T>,
    shape: AccumulatorShape,
    failures: Arc<AtomicUsize>,
}

impl<T> Accumulator<T> {
    #[inline]
    pub fn shape(&self) -> AccumulatorShape {
        self.shape
    }

    /// Events the bridge could not convert or deliver
    #[inline]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Items delivered so far, not yet drained
    #[inline]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Settle the accumulator against the result of the native wait
    ///
    /// After a failed wait everything collected is discarded and the wait's
    /// error is returned. After a successful wait the items come back in
    /// arrival order; a tuple-shaped accumulator must hold exactly its size.
    pub fn finish(self, wait: NativeResult<()>) -> VixResult<Vec<T>> {
        if let Err(err) = wait {
            debug!(discarded = self.receiver.len(), "native wait failed, discarding accumulator");
            return Err(err.into());
        }

        let items: Vec<T> = self.receiver.try_iter().collect();
        let failures = self.failures();
        if failures > 0 {
            warn!(failures, collected = items.len(), "callback items lost to conversion failures");
        }

        match self.shape {
            AccumulatorShape::Tuple(expected) if items.len() != expected => {
                Err(VixError::internal(format!(
                    "expected {} callback items, received {}",
                    expected,
                    items.len()
                )))
            }
            _ => Ok(items),
        }
    }
}

/// Sending end, invoked from native callback threads
pub struct CallbackBridge<T> {
    runtime: Runtime,
    sender: Sender<T>,
    event_kind: i32,
    convert: Converter<T>,
    failures: Arc<AtomicUsize>,
}

impl<T: Send + 'static> CallbackBridge<T> {
    /// Pair a bridge for events of `event_kind` with a fresh accumulator
    pub fn new(
        runtime: Runtime,
        event_kind: i32,
        shape: AccumulatorShape,
        convert: Converter<T>,
    ) -> (Self, Accumulator<T>) {
        let (sender, receiver) = match shape {
            AccumulatorShape::List => flume::unbounded(),
            AccumulatorShape::Tuple(size) => flume::bounded(size.max(1)),
        };
        let failures = Arc::new(AtomicUsize::new(0));

        let bridge = Self {
            runtime,
            sender,
            event_kind,
            convert,
            failures: Arc::clone(&failures),
        };
        let accumulator = Accumulator {
            receiver,
            shape,
            failures,
        };
        (bridge, accumulator)
    }

    /// Handle one native event
    ///
    /// Never panics and never returns an error: failures are logged and
    /// counted, and the waiting thread learns of trouble from the native
    /// call's own result.
    pub fn on_native_event(&self, event: NativeEvent) {
        if event.kind != self.event_kind {
            return;
        }

        let managed = self.runtime.enter_foreign();

        let item = match (self.convert)(managed.api(), event) {
            Ok(item) => item,
            Err(err) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                warn!(error = %err, info = %event.info, "failed to convert callback item");
                return;
            }
        };

        if let Err(err) = self.sender.try_send(item) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            warn!(error = %err, "failed to deliver callback item");
        }

        drop(managed);
    }

    /// Turn the bridge into a callback the native library can hold
    pub fn into_callback(self) -> EventCallback {
        let bridge = Arc::new(self);
        Arc::new(move |event: NativeEvent| bridge.on_native_event(event))
    }
}

/// Bridge collecting the location string of every found item, in order
pub fn found_item_locations(runtime: Runtime) -> (CallbackBridge<String>, Accumulator<String>) {
    let convert: Converter<String> = Arc::new(|api: &dyn NativeApi, event: NativeEvent| {
        if !event.info.is_valid() {
            return Err(VixError::internal("found-item event without an info handle"));
        }
        let value = extract_property(api, event.info, VIX_PROPERTY_FOUND_ITEM_LOCATION)?;
        value
            .into_string()
            .ok_or_else(|| VixError::internal("found-item location is not a string"))
    });
    CallbackBridge::new(runtime, VIX_EVENTTYPE_FIND_ITEM, AccumulatorShape::List, convert)
}
