use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use slog::o;
use tokio::sync::mpsc;

use leasewatch::config;
use leasewatch::store::Engine;

const CONFIG: &str = "\
# Generated for the lab segment
subnet 192.168.1.0 netmask 255.255.255.0 {
  option routers 192.168.1.1;
  range 192.168.1.10 192.168.1.12;
}
";

const LEASES: &str = "\
# The format of this file is documented in the dhcpd.leases(5) manual page.
lease 192.168.1.10 {
  starts 6 2012/12/01 15:07:57;
  ends 6 2012/12/01 15:08:50;
  binding state active;
  hardware ethernet 64:20:0c:69:75:60;
}
lease 192.168.1.11 {
  starts 6 2012/12/01 15:07:57;
  ends never;
  binding state active;
  client-hostname \"printer\";
}
lease 192.168.1.12 {
  starts 6 2012/12/01 15:07:57;
  ends 6 2012/12/01 15:08:50;
  binding state free;
}
";

struct TestGuard(PathBuf);

impl Drop for TestGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn lease_file(name: &str, content: &str) -> (PathBuf, TestGuard) {
    let path = std::env::temp_dir().join(format!("leasewatch_e2e_{}.leases", name));
    std::fs::write(&path, content).unwrap();
    (path.clone(), TestGuard(path))
}

fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, o!())
}

#[tokio::test]
async fn reparse_reflects_config_and_lease_file() {
    let subnet = config::parse(CONFIG).unwrap();
    assert_eq!(subnet.pool_size, 3);

    let (path, _guard) = lease_file("snapshot", LEASES);
    let engine = Engine::create(path, subnet, test_logger());

    let meta = engine.reparse().await.unwrap();
    assert_eq!(meta.used_count, 2);
    assert_eq!(meta.pool_size, 3);

    let snapshot = engine.current_snapshot().unwrap();
    let mut addresses: Vec<_> = snapshot.leases.keys().copied().collect();
    addresses.sort();
    assert_eq!(
        addresses,
        vec![Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 11)]
    );

    let unbounded = &snapshot.leases[&Ipv4Addr::new(192, 168, 1, 11)];
    assert_eq!(unbounded.ends_at, Some(2147483647));
}

#[tokio::test]
async fn change_cycle_notifies_with_diff() {
    let subnet = config::parse(CONFIG).unwrap();
    let (path, _guard) = lease_file("diff", LEASES);
    let engine = Arc::new(Engine::create(path.clone(), subnet, test_logger()));

    let mut events = engine.subscribe();
    let (triggers, trigger_rx) = mpsc::channel(8);
    tokio::spawn(Arc::clone(&engine).run(trigger_rx));

    // Initial parse: metadata only, nothing to diff against
    triggers.send(()).await.unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event.meta.used_count, 2);
    assert!(event.changed.is_none());

    // .10 renews; .11 stays put
    let renewed = LEASES.replace(
        "  ends 6 2012/12/01 15:08:50;\n  binding state active;",
        "  ends 6 2012/12/01 16:08:50;\n  binding state active;",
    );
    std::fs::write(&path, renewed).unwrap();

    triggers.send(()).await.unwrap();
    let event = events.recv().await.unwrap();
    let changed = event.changed.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].ip, Ipv4Addr::new(192, 168, 1, 10));
}
