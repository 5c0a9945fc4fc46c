use reconscope::editor::ScopeEditor;
use reconscope::engine::{AssetKind, ScopeDirection};
use reconscope::error::StoreError;
use reconscope::inventory::{Inventory, Target};
use reconscope::pipeline::AssetIngestPipeline;
use reconscope::store::{SqliteStore, Store};
use std::sync::Arc;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

async fn setup() -> Arc<dyn Store> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
    store.create_program("acme").await.unwrap();
    store.create_program("globex").await.unwrap();

    let editor = ScopeEditor::new(store.clone());
    editor
        .add_inscope("acme", &strings(&["*.acme.com"]))
        .await
        .unwrap();
    editor
        .add_outscope("acme", &strings(&["vpn.acme.com"]))
        .await
        .unwrap();
    editor
        .add_inscope("globex", &strings(&["*.globex.io"]))
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_end_to_end_ingest() {
    let store = setup().await;
    let pipeline = AssetIngestPipeline::new(store.clone());

    let outcome = pipeline
        .add_domains(
            &strings(&["www.acme.com:1.1.1.1", "vpn.acme.com", "*.dev.acme.com"]),
            "acme",
            Some("subfinder"),
        )
        .await
        .unwrap();
    assert_eq!(outcome.added, strings(&["www.acme.com", "dev.acme.com"]));
    assert_eq!(outcome.stats.out_of_scope, 1);

    let (inscope, _) = store.get_program_scope("acme").await.unwrap();
    assert_eq!(inscope, strings(&["*.acme.com", "*.dev.acme.com"]));

    pipeline
        .add_domains(&strings(&["api.globex.io"]), "globex", None)
        .await
        .unwrap();

    let inventory = Inventory::new(store.clone());
    assert_eq!(
        inventory.domains(Some("acme")).await.unwrap(),
        strings(&["dev.acme.com", "www.acme.com"])
    );
    assert_eq!(inventory.domains(None).await.unwrap().len(), 3);

    // Re-adding a stored domain without links has nothing to merge
    let outcome = pipeline
        .add_domains(&strings(&["www.acme.com"]), "acme", None)
        .await
        .unwrap();
    assert_eq!(outcome.duplicates, strings(&["www.acme.com"]));
}

#[tokio::test]
async fn test_urls_by_hostname() {
    let store = setup().await;
    let pipeline = AssetIngestPipeline::new(store.clone());

    pipeline
        .add_urls(
            &strings(&[
                "https://www.acme.com/login?next=/",
                "https://www.acme.com/login?next=/home",
                "http://shop.acme.com/cart 302 0",
            ]),
            "acme",
            None,
            None,
        )
        .await
        .unwrap();

    let inventory = Inventory::new(store.clone());
    assert_eq!(
        inventory.urls_by_hostname("www.acme.com").await.unwrap(),
        strings(&["https://www.acme.com/login"])
    );
    assert_eq!(inventory.urls(Some("acme")).await.unwrap().len(), 2);
    assert!(inventory.urls(Some("globex")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ips_and_removal() {
    let store = setup().await;
    let pipeline = AssetIngestPipeline::new(store.clone());

    pipeline
        .add_ips(&strings(&["104.16.1.1", "8.8.8.8:dns.acme.com"]), "acme", None)
        .await
        .unwrap();

    let updated = pipeline
        .update_ips(&strings(&["8.8.8.8:www.acme.com"]), "acme")
        .await
        .unwrap();
    assert_eq!(updated, strings(&["8.8.8.8"]));

    let removed = pipeline
        .remove_ips(&strings(&["104.16.1.1", "104.16.1.1"]), "acme")
        .await
        .unwrap();
    assert_eq!(removed, strings(&["104.16.1.1"]));
    assert_eq!(
        store.list_assets(AssetKind::Ip, Some("acme")).await.unwrap(),
        strings(&["8.8.8.8"])
    );
}

#[tokio::test]
async fn test_disabled_programs_and_scope() {
    let store = setup().await;
    store.set_program_disabled("globex", true).await.unwrap();

    assert_eq!(store.list_programs(false).await.unwrap(), strings(&["acme"]));

    let inventory = Inventory::new(store.clone());
    let enabled = inventory
        .resolve_scope(
            Target::All {
                include_disabled: false,
            },
            ScopeDirection::In,
            true,
            false,
        )
        .await
        .unwrap();
    assert_eq!(enabled, strings(&["acme.com"]));

    let outscope = inventory
        .resolve_scope(Target::Program("acme"), ScopeDirection::Out, false, false)
        .await
        .unwrap();
    assert_eq!(outscope, strings(&["vpn.acme.com"]));
}

#[tokio::test]
async fn test_missing_program() {
    let store = setup().await;
    assert!(matches!(
        store.get_program_scope("ghost").await,
        Err(StoreError::ProgramNotFound(_))
    ));
    assert!(matches!(
        store.create_program("acme").await,
        Err(StoreError::ProgramExists(_))
    ));
}
