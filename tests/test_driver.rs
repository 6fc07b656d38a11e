extern crate live_detect;

use std::time::Duration;
use live_detect::common::ExecutionBackend;
use live_detect::scheduler::{IntervalDriver, Scheduler, SchedulerState};

mod support;
use support::*;

#[tokio::test]
async fn driver_runs_until_source_is_exhausted() -> anyhow::Result<()> {
    let mut session = FakeSession::new(ExecutionBackend::Cpu, (32, 32));
    for _ in 0..3 {
        session = session.with_output(Ok(pre_suppressed(&[[2., 2., 10., 10., 0.7, 5.]])));
    }

    let driver = IntervalDriver::new(Duration::from_millis(1));
    let mut scheduler = Scheduler::new(
        config(),
        FakeSource::new((48, 32)).finite(3),
        RecordingSurface::default(),
        driver.signal(),
    )?;
    scheduler.start(async { Ok(session) }).await?;

    let summary = tokio::time::timeout(Duration::from_secs(5), driver.run(&mut scheduler)).await?;

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(scheduler.surface().presents, 3);
    assert_eq!(scheduler.surface().size, (48, 32));
    Ok(())
}

#[tokio::test]
async fn driver_exits_on_cancel() -> anyhow::Result<()> {
    let driver = IntervalDriver::new(Duration::from_millis(1));
    let source = FakeSource::new((32, 32));
    source.ready.store(false, std::sync::atomic::Ordering::SeqCst);
    let mut scheduler = Scheduler::new(config(), source, RecordingSurface::default(), driver.signal())?;
    scheduler
        .start(async { Ok(FakeSession::new(ExecutionBackend::Cpu, (32, 32))) })
        .await?;

    let cancel = scheduler.cancel_token();
    let (summary, _) = tokio::join!(driver.run(&mut scheduler), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    assert_eq!(summary.completed, 0);
    assert!(summary.not_ready > 0);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    Ok(())
}
