//! Elastic run simulation binary
//!
//! Spins up a small in-process worker group, injects a worker failure and a
//! membership event mid-run, and logs the recovery cycle end to end.

use std::sync::Arc;
use std::thread;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collective::{Collective, LocalCollective, LocalGroup};
use elastic::{ElasticRunner, ObjectState, State};
use runtime_core::{Error, MembershipNotifier, Result, TrackedValue, TrackedValues};

const WORLD_SIZE: usize = 3;
const TARGET_EPOCH: u64 = 6;

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elastic=info,runtime_core=info,collective=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let notifier = Arc::new(MembershipNotifier::new());
    let group = LocalGroup::new(WORLD_SIZE);

    tracing::info!(world_size = WORLD_SIZE, "Starting simulated elastic run");

    let handles: Vec<_> = group
        .members()
        .into_iter()
        .map(|member| {
            let notifier = Arc::clone(&notifier);
            thread::spawn(move || worker(member, &notifier))
        })
        .collect();

    for handle in handles {
        match handle.join().expect("worker thread panicked") {
            Ok(epoch) => tracing::info!(epoch = epoch, "Worker finished"),
            Err(err) => tracing::error!(error = %err, "Worker failed"),
        }
    }
}

fn worker(member: LocalCollective, notifier: &MembershipNotifier) -> Result<u64> {
    let rank = member.rank();
    let collective: Arc<dyn Collective> = Arc::new(member);

    let mut initial = TrackedValues::new();
    initial.insert("epoch".to_string(), TrackedValue::Uint(0));
    initial.insert("lr".to_string(), TrackedValue::Float(0.1));
    let mut state = ObjectState::new(collective, initial);

    state.register_reset_callbacks(vec![Box::new(move || {
        tracing::info!(rank = rank, "Rescaling learning rate for new group size");
        Ok(())
    })]);

    let mut failed_once = false;
    let mut notified = false;
    let mut runner = ElasticRunner::new(notifier);

    let result = runner.run(
        &mut state,
        || {
            tracing::info!(rank = rank, "Rebuilding partition plan");
            Ok(())
        },
        |state| {
            let mut epoch = state.get_uint("epoch").unwrap_or(0);
            while epoch < TARGET_EPOCH {
                // Every rank fails the same step once, as if a collective
                // op aborted group-wide.
                if epoch == 2 && !failed_once {
                    failed_once = true;
                    return Err(Error::worker_failure("simulated training crash"));
                }

                // Rank 0 observes a host joining mid-run; the notifier fans
                // the event out to every worker's state.
                if epoch == 4 && !notified {
                    notified = true;
                    if rank == 0 {
                        notifier.notify(100);
                    }
                }

                epoch += 1;
                state.set("epoch", epoch)?;
                state.commit()?;
            }
            Ok(epoch)
        },
    );

    tracing::info!(
        rank = rank,
        worker_failures = runner.stats().worker_failures,
        membership_changes = runner.stats().membership_changes,
        resets = runner.stats().resets,
        "Run complete"
    );
    result
}
