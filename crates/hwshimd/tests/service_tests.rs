//! Tests for the daemon service over the export port

use std::fs;

use hwshim_common::config::{ExportConfig, LoggingConfig};
use hwshim_common::{HwshimConfig, LifecycleState, ProfileStore, StatusReport};
use hwshimd::Service;
use tempfile::TempDir;

fn config_for(export: &TempDir) -> HwshimConfig {
    HwshimConfig {
        logging: LoggingConfig::default(),
        export: ExportConfig {
            root: export.path().to_path_buf(),
        },
    }
}

#[test]
fn test_start_exports_every_endpoint() {
    let profile = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    fs::write(profile.path().join("dmi_sys_vendor"), "Acme Holdings\n").unwrap();

    let service = Service::with_store(&config_for(&export), ProfileStore::new(profile.path()));
    service.start().unwrap();

    let root = export.path();
    assert_eq!(
        fs::read(root.join("sys/class/dmi/id/sys_vendor")).unwrap(),
        b"Acme Holdings\n"
    );
    assert_eq!(
        fs::read(root.join("sys/class/dmi/id/product_name")).unwrap(),
        b"Standard PC\n"
    );
    let cpuinfo = fs::read_to_string(root.join("proc/cpuinfo")).unwrap();
    assert!(cpuinfo.starts_with("processor\t: 0\n"));

    let status = StatusReport::load(service.status_path()).unwrap();
    assert_eq!(status.state, LifecycleState::Active);
    assert!(status.descriptors.iter().all(|d| d.installed));
}

#[test]
fn test_stop_removes_exported_files() {
    let profile = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let service = Service::with_store(&config_for(&export), ProfileStore::new(profile.path()));
    service.start().unwrap();
    service.stop().unwrap();

    let root = export.path();
    assert!(!root.join("proc/cpuinfo").exists());
    assert!(!root.join("sys/class/dmi/id/product_uuid").exists());

    let status = StatusReport::load(service.status_path()).unwrap();
    assert_eq!(status.state, LifecycleState::Unloaded);
    assert!(status.descriptors.iter().all(|d| !d.installed));
}

#[test]
fn test_stop_without_start_fails() {
    let profile = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();

    let service = Service::with_store(&config_for(&export), ProfileStore::new(profile.path()));
    assert!(service.stop().is_err());
    assert_eq!(service.lifecycle().state(), LifecycleState::Unloaded);
}

#[test]
fn test_start_failure_rolls_back() {
    let profile = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    // A file where the sysfs tree should go makes the attribute exports fail
    fs::write(export.path().join("sys"), b"").unwrap();

    let service = Service::with_store(&config_for(&export), ProfileStore::new(profile.path()));
    let err = service.start().unwrap_err();
    assert!(format!("{:#}", err).contains("activation failed at dmi.sys_vendor"));

    assert_eq!(service.lifecycle().state(), LifecycleState::Unloaded);
    assert!(!export.path().join("proc/cpuinfo").exists());

    let status = StatusReport::load(service.status_path()).unwrap();
    assert_eq!(status.state, LifecycleState::Unloaded);
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let profile = TempDir::new().unwrap();
    let export = TempDir::new().unwrap();
    let service = Service::with_store(&config_for(&export), ProfileStore::new(profile.path()));

    let cpuinfo = export.path().join("proc/cpuinfo");
    let seen = cpuinfo.clone();
    service
        .run_until(async move {
            assert!(seen.exists());
            Ok(())
        })
        .await
        .unwrap();

    assert!(!cpuinfo.exists());
    assert_eq!(service.lifecycle().state(), LifecycleState::Unloaded);
}
