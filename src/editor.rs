use crate::store::{Store, StoreResult};
use std::sync::Arc;
use tracing::info;

/// Set-like edits of a program's inscope, outscope and blacklist lists.
///
/// Each call reads the lists once, applies every element, and writes them
/// back in a single update.
#[derive(Clone)]
pub struct ScopeEditor {
    store: Arc<dyn Store>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeList {
    In,
    Out,
}

impl ScopeEditor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn add_inscope(&self, program: &str, elements: &[String]) -> StoreResult<Vec<String>> {
        self.edit_scope(program, ScopeList::In, |list| add_unique(list, elements))
            .await
    }

    pub async fn remove_inscope(&self, program: &str, elements: &[String]) -> StoreResult<Vec<String>> {
        self.edit_scope(program, ScopeList::In, |list| remove_all(list, elements))
            .await
    }

    pub async fn add_outscope(&self, program: &str, elements: &[String]) -> StoreResult<Vec<String>> {
        self.edit_scope(program, ScopeList::Out, |list| add_unique(list, elements))
            .await
    }

    pub async fn remove_outscope(&self, program: &str, elements: &[String]) -> StoreResult<Vec<String>> {
        self.edit_scope(program, ScopeList::Out, |list| remove_all(list, elements))
            .await
    }

    pub async fn add_blacklist(&self, program: &str, elements: &[String]) -> StoreResult<Vec<String>> {
        let mut blacklist = self.store.get_program_blacklist(program).await?;
        let added = add_unique(&mut blacklist, elements);
        self.store.update_program_blacklist(program, &blacklist).await?;
        info!("Blacklist of {}: {} added", program, added.len());
        Ok(added)
    }

    pub async fn remove_blacklist(&self, program: &str, elements: &[String]) -> StoreResult<Vec<String>> {
        let mut blacklist = self.store.get_program_blacklist(program).await?;
        let removed = remove_all(&mut blacklist, elements);
        self.store.update_program_blacklist(program, &blacklist).await?;
        info!("Blacklist of {}: {} removed", program, removed.len());
        Ok(removed)
    }

    async fn edit_scope<F>(
        &self,
        program: &str,
        which: ScopeList,
        edit: F,
    ) -> StoreResult<Vec<String>>
    where
        F: FnOnce(&mut Vec<String>) -> Vec<String>,
    {
        let (mut inscope, mut outscope) = self.store.get_program_scope(program).await?;
        let changed = match which {
            ScopeList::In => edit(&mut inscope),
            ScopeList::Out => edit(&mut outscope),
        };
        self.store
            .update_program_scope(program, &inscope, &outscope)
            .await?;
        info!(
            "Scope of {} ({:?}): {} elements changed",
            program,
            which,
            changed.len()
        );
        Ok(changed)
    }
}

/// Appends missing, non-empty elements. Returns the ones added.
fn add_unique(list: &mut Vec<String>, elements: &[String]) -> Vec<String> {
    let before = list.len();
    for element in elements {
        let element = element.trim();
        if !element.is_empty() && !list.iter().any(|e| e == element) {
            list.push(element.to_string());
        }
    }
    list[before..].to_vec()
}

/// Drops every occurrence of the elements. Returns the ones removed.
fn remove_all(list: &mut Vec<String>, elements: &[String]) -> Vec<String> {
    let (removed, kept): (Vec<String>, Vec<String>) = list
        .drain(..)
        .partition(|e| elements.iter().any(|r| r.trim() == e));
    *list = kept;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_unique_and_remove_all() {
        let mut list = strings(&["a", "b"]);
        assert_eq!(
            add_unique(&mut list, &strings(&["b", "c", "", "c"])),
            strings(&["c"])
        );
        assert_eq!(list, strings(&["a", "b", "c"]));

        assert_eq!(remove_all(&mut list, &strings(&["a", "zzz"])), strings(&["a"]));
        assert_eq!(list, strings(&["b", "c"]));
        assert!(remove_all(&mut list, &strings(&["a"])).is_empty());
    }

    #[tokio::test]
    async fn test_scope_edits_persist_both_lists() {
        let store = Arc::new(MemoryStore::new());
        store.create_program("acme").await.unwrap();
        let editor = ScopeEditor::new(store.clone());

        editor
            .add_inscope("acme", &strings(&["*.acme.com", "acme.com"]))
            .await
            .unwrap();
        editor
            .add_outscope("acme", &strings(&["vpn.acme.com"]))
            .await
            .unwrap();
        editor
            .add_inscope("acme", &strings(&["*.acme.com"]))
            .await
            .unwrap();
        editor
            .remove_inscope("acme", &strings(&["acme.com", "missing.com"]))
            .await
            .unwrap();

        let (inscope, outscope) = store.get_program_scope("acme").await.unwrap();
        assert_eq!(inscope, strings(&["*.acme.com"]));
        assert_eq!(outscope, strings(&["vpn.acme.com"]));

        editor
            .remove_outscope("acme", &strings(&["vpn.acme.com"]))
            .await
            .unwrap();
        let (_, outscope) = store.get_program_scope("acme").await.unwrap();
        assert!(outscope.is_empty());
    }

    #[tokio::test]
    async fn test_blacklist_edits() {
        let store = Arc::new(MemoryStore::new());
        store.create_program("acme").await.unwrap();
        let editor = ScopeEditor::new(store.clone());

        editor
            .add_blacklist("acme", &strings(&["10.0.0.1", "bad.acme.com", "10.0.0.1"]))
            .await
            .unwrap();
        editor
            .remove_blacklist("acme", &strings(&["10.0.0.1"]))
            .await
            .unwrap();

        assert_eq!(
            store.get_program_blacklist("acme").await.unwrap(),
            strings(&["bad.acme.com"])
        );
    }
}
