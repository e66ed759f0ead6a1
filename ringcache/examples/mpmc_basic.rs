//! Average Calculator - MPMC (4 Producers, 4 Consumers)
//!
//! Producers retry when the ring is full; consumers stop on a sentinel.

use ringcache::MpmcRingBuffer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const RING_SIZE: usize = 64 * 1024;
const MESSAGES_PER_PRODUCER: u64 = 250_000;
const NUM_PRODUCERS: usize = 4;
const NUM_CONSUMERS: usize = 4;
const MAX_NUMBER: u64 = MESSAGES_PER_PRODUCER * NUM_PRODUCERS as u64;

fn put_blocking(ring: &MpmcRingBuffer<u64>, mut value: u64) {
    while let Err(full) = ring.put(value) {
        value = full.into_inner();
        std::hint::spin_loop();
    }
}

fn main() {
    println!("\n=== Average Calculator - MPMC (4P/4C) ===\n");
    println!("Task: average of numbers 1 to {}", MAX_NUMBER);

    let ring = Arc::new(MpmcRingBuffer::<u64>::new(RING_SIZE).unwrap());
    println!("Ring capacity: {}\n", ring.capacity());

    let start = Instant::now();
    let total_sum = Arc::new(AtomicU64::new(0));
    let total_count = Arc::new(AtomicU64::new(0));

    let producers: Vec<_> = (0..NUM_PRODUCERS)
        .map(|producer_id| {
            let ring = ring.clone();
            thread::spawn(move || {
                let start_num = producer_id as u64 * MESSAGES_PER_PRODUCER + 1;
                let end_num = start_num + MESSAGES_PER_PRODUCER;
                for number in start_num..end_num {
                    put_blocking(&ring, number);
                }
                println!(
                    "Producer {}: sent {} to {}",
                    producer_id,
                    start_num,
                    end_num - 1
                );
            })
        })
        .collect();

    let consumers: Vec<_> = (0..NUM_CONSUMERS)
        .map(|consumer_id| {
            let ring = ring.clone();
            let total_sum = total_sum.clone();
            let total_count = total_count.clone();
            thread::spawn(move || {
                let mut local_sum = 0u64;
                let mut local_count = 0u64;
                loop {
                    match ring.get() {
                        // Sentinel
                        Some(0) => break,
                        Some(value) => {
                            local_sum += value;
                            local_count += 1;
                        }
                        None => std::hint::spin_loop(),
                    }
                }
                total_sum.fetch_add(local_sum, Ordering::Relaxed);
                total_count.fetch_add(local_count, Ordering::Relaxed);
                println!("Consumer {}: processed {} numbers", consumer_id, local_count);
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    for _ in 0..NUM_CONSUMERS {
        put_blocking(&ring, 0);
    }
    for handle in consumers {
        handle.join().unwrap();
    }

    let duration = start.elapsed();
    let sum = total_sum.load(Ordering::Relaxed);
    let count = total_count.load(Ordering::Relaxed);
    let expected_sum = MAX_NUMBER * (MAX_NUMBER + 1) / 2;

    println!("\nNumbers processed: {}", count);
    println!("Sum:               {} (expected {})", sum, expected_sum);
    println!("Average:           {:.1}", sum as f64 / count as f64);
    println!("Time taken:        {:.3}s", duration.as_secs_f64());
    assert_eq!(sum, expected_sum, "Sum mismatch!");
    assert_eq!(count, MAX_NUMBER, "Count mismatch!");

    let throughput = count as f64 / duration.as_secs_f64() / 1_000_000.0;
    println!("\nThroughput: {:.2}M numbers/sec", throughput);
}
