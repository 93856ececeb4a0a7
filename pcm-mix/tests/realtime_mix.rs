//! The mix callback must never reach the allocator
//!
//! Lives in its own test binary because the counting allocator replaces
//! the global one for everything linked in.

use pcm_mix::{ControlConfig, Mixer};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct CountingAlloc;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
    static FREES: Cell<usize> = const { Cell::new(0) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
    let _ = counter.try_with(|c| c.set(c.get() + 1));
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        bump(&ALLOCS);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        bump(&FREES);
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        bump(&ALLOCS);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

fn counts() -> (usize, usize) {
    (ALLOCS.with(Cell::get), FREES.with(Cell::get))
}

#[test]
fn test_mix_never_allocates_or_frees() {
    let dir = tempfile::tempdir().unwrap();
    let mixer = Arc::new(Mixer::new(48000));
    // Capture runs on the producer thread and must not leak onto the mix path
    mixer.start_log_dsp_audio(dir.path().join("dsp.wav")).unwrap();

    let running = Arc::new(AtomicBool::new(true));

    let producer = {
        let mixer = mixer.clone();
        let running = running.clone();
        thread::spawn(move || {
            let block: Vec<i16> = (0..160).flat_map(|i| [i, -i]).collect();
            while running.load(Ordering::Relaxed) {
                mixer.push_samples(&block);
                mixer.push_streaming_samples(&block);
                mixer.push_wiimote_speaker_samples(&block[..32], 3000);
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let control = {
        let mixer = mixer.clone();
        let running = running.clone();
        thread::spawn(move || {
            let mut watermark = 256;
            while running.load(Ordering::Relaxed) {
                let config = ControlConfig {
                    low_watermark: watermark,
                    ..Default::default()
                };
                mixer.set_control_config(config).unwrap();
                mixer.update_speed(if watermark % 512 == 0 { 1.0 } else { 2.0 });
                watermark = if watermark >= 2048 { 256 } else { watermark + 256 };
                thread::yield_now();
            }
        })
    };

    let audio = {
        let mixer = mixer.clone();
        thread::spawn(move || {
            let mut out = vec![0i16; 512 * 2];
            // First call on a fresh thread included
            let before = counts();
            for i in 0..2000 {
                mixer.mix(&mut out, 512, i % 3 != 0);
            }
            let after = counts();
            (after.0 - before.0, after.1 - before.1)
        })
    };

    let (allocs, frees) = audio.join().unwrap();
    running.store(false, Ordering::Relaxed);
    producer.join().unwrap();
    control.join().unwrap();
    mixer.stop_log_dsp_audio().unwrap();

    assert_eq!((allocs, frees), (0, 0));
    assert_eq!(mixer.stats().frames_mixed, 2000 * 512);
}
