use eon_ledger::{Address, DeploymentRecord, DeploymentRegistry, JsonFileRegistry};

fn record(byte: u8, implementation: Option<Address>) -> DeploymentRecord {
    DeploymentRecord {
        address: Address::from_bytes([byte; 20]),
        implementation,
        newly_deployed: true,
        contract: "CErc20Upgradable".to_string(),
        content_hash: format!("{byte:02x}").repeat(32),
    }
}

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let reg = JsonFileRegistry::new(dir.path().join("deployments").join("BSC.json"));
    assert!(reg.all().await.unwrap().is_empty());
    assert_eq!(reg.get("Unitroller").await.unwrap(), None);
}

#[tokio::test]
async fn records_survive_a_fresh_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deployments").join("BSC.json");

    let reg = JsonFileRegistry::new(&path);
    reg.put("Unitroller", record(1, None)).await.unwrap();
    reg.put(
        "CErc20Upgradable_USDT",
        record(2, Some(Address::from_bytes([3; 20]))),
    )
    .await
    .unwrap();

    // No caching: a second handle on the same path sees both records.
    let again = JsonFileRegistry::new(&path);
    let all = again.all().await.unwrap();
    assert_eq!(
        all.keys().cloned().collect::<Vec<_>>(),
        vec!["CErc20Upgradable_USDT".to_string(), "Unitroller".to_string()]
    );
    assert_eq!(
        all["CErc20Upgradable_USDT"].implementation,
        Some(Address::from_bytes([3; 20]))
    );
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn external_edit_is_visible_on_next_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("BSC.json");
    let reg = JsonFileRegistry::new(&path);
    reg.put("Comptroller", record(4, None)).await.unwrap();

    std::fs::write(&path, "{}").unwrap();
    assert_eq!(reg.get("Comptroller").await.unwrap(), None);
}

#[tokio::test]
async fn corrupt_file_is_a_registry_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("BSC.json");
    std::fs::write(&path, "not json").unwrap();
    let err = JsonFileRegistry::new(&path).all().await.unwrap_err();
    assert!(err.to_string().starts_with("deployment registry:"));
}
