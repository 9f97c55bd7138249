//! One run of a single-channel loss system that cannot keep up.
#![allow(clippy::expect_used)]
use erlang_loss::arrival::ArrivalSource;
use erlang_loss::experiment::await_drain;
use erlang_loss::ChannelPool;
use std::thread;
use std::time::Duration;

fn main() {
    env_logger::init();

    // One channel, one second of service per arrival.
    let pool = ChannelPool::new(1, 1.0).expect("valid config");
    let source = ArrivalSource::new(pool.clone());

    // The second arrival lands while the first is still being served, so it
    // is rejected.
    for id in 1..=2 {
        println!("Arrival #{id}: {:?}", source.emit(id));
        thread::sleep(Duration::from_millis(100));
    }

    await_drain(&pool, Duration::from_millis(100));
    pool.check_invariants().expect("engine invariants hold");

    println!("{:#?}", pool.snapshot());
    println!("Rejection probability: {:.4}", pool.rejection_probability());
}
