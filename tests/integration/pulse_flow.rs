//! End-to-end pulse flow: registration, heartbeat suppression, endpoint
//! change, and late-joiner initial sync.

use crate::*;

#[tokio::test]
async fn register_heartbeat_change_and_late_join() -> Result<()> {
    let registry = start_registry(Duration::from_secs(1200)).await?;

    // A registers and sees its own confirmed endpoint.
    let mut a = Switch::connect(registry.addr).await?;
    a.pulse("10.0.0.1", 9000).await?;
    assert_eq!(a.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9000));

    // An identical heartbeat produces no traffic at all.
    a.pulse("10.0.0.1", 9000).await?;
    a.expect_silence(Duration::from_millis(300)).await?;

    // A port change fans out again.
    a.pulse("10.0.0.1", 9001).await?;
    assert_eq!(a.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9001));

    // B joins late: unicast snapshot of the existing peer first, then B's
    // own confirmed upsert, broadcast to everyone including A.
    let mut b = Switch::connect(registry.addr).await?;
    b.pulse("10.0.0.2", 7000).await?;
    assert_eq!(b.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9001));
    assert_eq!(b.recv().await?, set_addr("10.0.0.2", "127.0.0.1", 7000));
    assert_eq!(a.recv().await?, set_addr("10.0.0.2", "127.0.0.1", 7000));

    // B's snapshot was unicast — A must not have seen a replay of its own
    // record.
    a.expect_silence(Duration::from_millis(300)).await?;

    Ok(())
}

#[tokio::test]
async fn disconnected_switch_keeps_its_record() -> Result<()> {
    let registry = start_registry(Duration::from_secs(1200)).await?;

    let mut a = Switch::connect(registry.addr).await?;
    a.pulse("10.0.0.1", 9000).await?;
    a.recv().await?;
    drop(a); // record outlives the connection that created it

    // give the registry a moment to reap the connection
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut b = Switch::connect(registry.addr).await?;
    b.pulse("10.0.0.2", 7000).await?;
    assert_eq!(b.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9000));
    assert_eq!(b.recv().await?, set_addr("10.0.0.2", "127.0.0.1", 7000));

    Ok(())
}

#[tokio::test]
async fn same_identity_from_second_connection_wins() -> Result<()> {
    let registry = start_registry(Duration::from_secs(1200)).await?;

    let mut a = Switch::connect(registry.addr).await?;
    a.pulse("10.0.0.1", 9000).await?;
    a.recv().await?;

    // no ownership of identities: last writer wins by arrival order
    let mut b = Switch::connect(registry.addr).await?;
    b.pulse("10.0.0.1", 9500).await?;
    assert_eq!(b.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9000));
    assert_eq!(b.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9500));
    assert_eq!(a.recv().await?, set_addr("10.0.0.1", "127.0.0.1", 9500));

    Ok(())
}
