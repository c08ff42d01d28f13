use std::sync::Arc;
use std::thread;
use std::time::Duration;

use holdup::{Mutex, TraceLock, TraceOpts};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let ledger = Arc::new(Mutex::new(0u64));
    ledger.enable_tracer_with(TraceOpts {
        threshold: Duration::from_millis(20),
        id: Some("demo.ledger".into()),
    });

    let mut workers = Vec::new();
    for worker in 0..4u64 {
        let ledger = Arc::clone(&ledger);
        workers.push(
            thread::Builder::new()
                .name(format!("demo.worker.{worker}"))
                .spawn(move || {
                    for round in 0..8u64 {
                        let mut balance = ledger.lock();
                        // Odd rounds linger past the threshold on purpose.
                        let hold = if round % 2 == 1 { 35 } else { 5 };
                        thread::sleep(Duration::from_millis(hold));
                        *balance += worker + round;
                    }
                })
                .expect("failed to spawn demo worker"),
        );
    }

    for worker in workers {
        worker.join().expect("demo worker panicked");
    }

    println!(
        "final balance: {} (watch for demo.ledger warnings above)",
        *ledger.lock()
    );
}
