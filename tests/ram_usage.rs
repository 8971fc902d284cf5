//! Memory stays bounded however long the document is.
//!
//! Allocations are counted by a tracking global allocator; each test
//! reports the peak allocated while streaming, above what was allocated
//! before it started.

use lazyxml::{Error, HandlerObject, Handlers, Parser, Streamable, XmlNode, XmlText};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
            let mut peak = PEAK_ALLOCATED.load(Ordering::Relaxed);
            while current > peak {
                match PEAK_ALLOCATED.compare_exchange_weak(peak, current, Ordering::Relaxed, Ordering::Relaxed) {
                    Ok(_) => break,
                    Err(p) => peak = p,
                }
            }
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

/// Counters are process-wide: measurements must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

const ENTRIES: usize = 24;
const CHILDREN: usize = 37;
const REPEAT: usize = 10_000;

/// Run `f` and return its result with the peak memory it allocated.
fn measure<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let _serial = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let baseline = ALLOCATED.load(Ordering::SeqCst);
    PEAK_ALLOCATED.store(baseline, Ordering::SeqCst);
    let result = f();
    let peak = PEAK_ALLOCATED.load(Ordering::SeqCst);
    (result, peak.saturating_sub(baseline))
}

fn entry(i: usize) -> impl Iterator<Item = Vec<u8>> {
    let children = (0..CHILDREN).map(|j| format!("<a{j}>{}</a{j}>\n", format!("a{j}").repeat(REPEAT)).into_bytes());
    std::iter::once(b"<entry>\n".to_vec())
        .chain(children)
        .chain(std::iter::once(format!("<nb>{i}</nb>\n</entry>\n").into_bytes()))
}

/// A document produced piece by piece, never held whole.
fn document() -> Streamable {
    let pieces = std::iter::once(b"<root>\n".to_vec())
        .chain((0..ENTRIES).flat_map(entry))
        .chain(std::iter::once(b"</root>".to_vec()));
    Streamable::chain(pieces)
}

fn document_len() -> usize {
    (0..ENTRIES).flat_map(entry).map(|piece| piece.len()).sum()
}

fn assert_bounded(peak: usize) {
    let total = document_len();
    assert!(total > 20_000_000, "document too small to be meaningful: {total}");
    assert!(peak < total / 10, "peak {peak} for a {total} bytes document");
}

#[test]
fn test_ram_usage() {
    let (count, peak) = measure(|| {
        let handler = HandlerObject::new(()).method_text(
            ["root", "entry", "nb"],
            |_: &mut (), text: XmlText| -> Result<Option<usize>, Error> {
                text.text().parse().map(Some).map_err(Error::handler)
            },
        );
        let mut count = 0;
        for (expected, item) in Parser::new(document()).iter_from(Handlers::new().object(handler)).enumerate() {
            assert_eq!(item.unwrap(), expected);
            count += 1;
        }
        count
    });
    assert_eq!(count, ENTRIES);
    assert_bounded(peak);
}

#[test]
fn test_ram_usage_no_handler() {
    let (items, peak) = measure(|| {
        Parser::new(document())
            .iter_from(Handlers::new().catchall(|_: XmlNode| ()))
            .collect::<Result<Vec<()>, _>>()
            .unwrap()
    });
    assert!(items.is_empty());
    assert_bounded(peak);
}
