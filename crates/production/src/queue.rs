//! Production queue ordering.
//!
//! Dispatch order is the ascending composite key
//! `(status rank, -priority, created_at)`, with the job id as a final
//! tie-break so the order is total. The rank table is explicit:
//!
//! | rank | statuses                            |
//! |------|-------------------------------------|
//! | 0    | `pending`, `queued` (actionable)    |
//! | 1    | `printing`                          |
//! | 2    | `completed`, `failed`, `cancelled`  |
//!
//! `pending` and `queued` share a tier: a pending high-priority job goes
//! ahead of a queued low-priority one.

use core::cmp::Reverse;

use chrono::{DateTime, Utc};

use printworks_core::PrintJobId;

use crate::job::{PrintJob, PrintJobStatus};

/// Status precedence used by the dispatch key. Lower dispatches first.
pub fn status_rank(status: PrintJobStatus) -> u8 {
    match status {
        PrintJobStatus::Pending | PrintJobStatus::Queued => 0,
        PrintJobStatus::Printing => 1,
        PrintJobStatus::Completed | PrintJobStatus::Failed | PrintJobStatus::Cancelled => 2,
    }
}

/// Composite sort key of a job.
pub type DispatchKey = (u8, Reverse<i32>, DateTime<Utc>, PrintJobId);

pub fn dispatch_key(job: &PrintJob) -> DispatchKey {
    (
        status_rank(job.status),
        Reverse(job.priority),
        job.created_at,
        job.id,
    )
}

/// Sort jobs in place into dispatch order.
pub fn sort_for_dispatch(jobs: &mut [PrintJob]) {
    jobs.sort_by_key(dispatch_key);
}

/// The job a dispatcher should start next, if any job is waiting.
pub fn next_dispatchable<'a>(jobs: impl IntoIterator<Item = &'a PrintJob>) -> Option<&'a PrintJob> {
    jobs.into_iter()
        .filter(|job| job.status.is_dispatchable())
        .min_by_key(|job| dispatch_key(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::CreatePrintJob;
    use chrono::{Duration, TimeZone};
    use printworks_core::{OrderItemId, ProductId, WorkspaceId};
    use proptest::prelude::*;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn job(status: PrintJobStatus, priority: i32, created_at: DateTime<Utc>) -> PrintJob {
        let mut j = PrintJob::create(
            WorkspaceId::new(),
            &CreatePrintJob {
                job_id: PrintJobId::new(),
                order_item_id: OrderItemId::new(),
                product_id: ProductId::new(),
                component_label: String::new(),
                priority,
                filament_id: None,
                estimated_print_minutes: None,
                notes: String::new(),
                occurred_at: created_at,
            },
        )
        .unwrap();
        j.status = status;
        j
    }

    #[test]
    fn priority_then_age_within_actionable_tier() {
        let j1 = job(PrintJobStatus::Queued, 1, t(0));
        let j2 = job(PrintJobStatus::Queued, 5, t(10));
        let j3 = job(PrintJobStatus::Pending, 5, t(20));

        let mut jobs = vec![j1.clone(), j3.clone(), j2.clone()];
        sort_for_dispatch(&mut jobs);
        let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![j2.id, j3.id, j1.id]);

        assert_eq!(next_dispatchable(&jobs).map(|j| j.id), Some(j2.id));
    }

    #[test]
    fn printing_sorts_after_waiting_and_before_terminal() {
        let printing = job(PrintJobStatus::Printing, 9, t(0));
        let done = job(PrintJobStatus::Completed, 9, t(0));
        let waiting = job(PrintJobStatus::Pending, 1, t(100));

        let mut jobs = vec![done.clone(), printing.clone(), waiting.clone()];
        sort_for_dispatch(&mut jobs);
        let statuses: Vec<_> = jobs.iter().map(|j| j.status).collect();
        assert_eq!(
            statuses,
            vec![
                PrintJobStatus::Pending,
                PrintJobStatus::Printing,
                PrintJobStatus::Completed
            ]
        );
    }

    #[test]
    fn nothing_dispatchable_when_all_jobs_are_running_or_done() {
        let jobs = vec![
            job(PrintJobStatus::Printing, 3, t(0)),
            job(PrintJobStatus::Failed, 3, t(0)),
            job(PrintJobStatus::Cancelled, 3, t(0)),
        ];
        assert!(next_dispatchable(&jobs).is_none());
        let none: Vec<PrintJob> = Vec::new();
        assert!(next_dispatchable(&none).is_none());
    }

    #[test]
    fn equal_priority_is_fifo() {
        let older = job(PrintJobStatus::Queued, 3, t(0));
        let newer = job(PrintJobStatus::Pending, 3, t(1));
        let jobs = vec![newer, older.clone()];
        assert_eq!(next_dispatchable(&jobs).map(|j| j.id), Some(older.id));
    }

    fn status_strategy() -> impl Strategy<Value = PrintJobStatus> {
        prop::sample::select(PrintJobStatus::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: dispatch order does not depend on input order, and the
        /// next dispatchable job is the first waiting job of the sorted queue.
        #[test]
        fn ordering_is_input_independent(
            specs in prop::collection::vec((status_strategy(), 1i32..10, 0i64..50), 0..30)
        ) {
            let jobs: Vec<_> = specs
                .iter()
                .map(|(status, priority, offset)| job(*status, *priority, t(*offset)))
                .collect();

            let mut forward = jobs.clone();
            sort_for_dispatch(&mut forward);
            let mut backward: Vec<_> = jobs.iter().rev().cloned().collect();
            sort_for_dispatch(&mut backward);
            prop_assert_eq!(&forward, &backward);

            for pair in forward.windows(2) {
                prop_assert!(dispatch_key(&pair[0]) <= dispatch_key(&pair[1]));
            }

            let expected = forward.iter().find(|j| j.status.is_dispatchable()).map(|j| j.id);
            prop_assert_eq!(next_dispatchable(&jobs).map(|j| j.id), expected);
        }
    }
}
