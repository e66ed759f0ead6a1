//! Simple SPSC Example
//!
//! A sensor writes readings faster than a slow reader drains them. The ring
//! keeps only the newest readings: the producer never waits, and the reader
//! always sees values in the order they were written.

use ringcache::SpscRingBuffer;
use std::thread;
use std::time::Duration;

const RING_SIZE: usize = 16;
const READINGS: u64 = 10_000;

fn main() {
    println!("\n=== Simple SPSC Example ===\n");

    let (mut tx, mut rx) = SpscRingBuffer::<u64>::new(RING_SIZE).unwrap();
    println!("Ring capacity: {}", tx.capacity());

    // Producer thread
    let producer = thread::spawn(move || {
        let mut evicted = 0u64;
        for reading in 0..READINGS {
            if tx.put(reading) {
                evicted += 1;
            }
        }
        println!("Producer: wrote {} readings, evicted {}", READINGS, evicted);
        evicted
    });

    // Slow consumer
    let mut received = 0u64;
    let mut last = None;
    loop {
        match rx.get() {
            Some(reading) => {
                if let Some(prev) = last {
                    assert!(reading > prev, "readings out of order");
                }
                last = Some(reading);
                received += 1;
                if received % 100 == 0 {
                    thread::sleep(Duration::from_micros(50));
                }
            }
            None if producer.is_finished() && rx.is_empty() => break,
            None => thread::yield_now(),
        }
    }

    let evicted = producer.join().unwrap();
    println!("Consumer: received {} readings, last = {:?}", received, last);

    assert_eq!(received + evicted, READINGS);
    assert_eq!(last, Some(READINGS - 1));
    println!("Verified: received + evicted = {}", READINGS);
}
