//! Repository save, reload, and commit behavior against the memory store.

use std::sync::Arc;
use std::thread;

use ntest::timeout;
use serde_json::json;

use docmap_core::{
    DocumentStore, Expect, MemoryStore, ModelConfig, ModelError, ReadOptions, Record, Repository,
    ScanConsistency, Value,
};

use docmap_core::schema::SchemaDefinition;

use super::helpers::{article_schema, author_schema, repository};

#[timeout(1000)]
#[test]
fn test_create_then_find() -> anyhow::Result<()> {
    let repo = repository();
    let article = repo.create(article_schema(), [("title", Value::from("Hello"))])?;
    let id = article.id().map(str::to_string).unwrap();

    assert!(!article.is_new_record());
    assert!(article.changes().is_empty());
    assert!(article.attribute_previously_changed("title"));

    let found = repo.find(article_schema(), &id)?;
    assert_eq!(found.read_attribute("title"), Some(&Value::from("Hello")));
    assert_eq!(found.read_attribute("status"), Some(&Value::from("draft")));
    assert!(!found.is_changed());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_save_sends_partial_update() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(
        article_schema(),
        [("title", Value::from("Hello")), ("tags", Value::from(vec!["a"]))],
    )?;
    let id = article.id().map(str::to_string).unwrap();

    article.write_attribute("title", "Bye");
    article.modify_attribute("tags", |tags| {
        if let Some(items) = tags.as_array_mut() {
            items.push(Value::from("b"));
        }
    });
    assert!(repo.save(&mut article)?);
    assert_eq!(repo.store().write_count(), 1);

    let body = repo.store().body(&id)?.unwrap();
    assert!(body.get("title").is_none());
    assert_eq!(body["ttl"], json!("Bye"));
    assert_eq!(body["tags"], json!(["a", "b"]));
    assert!(article.saved_change_to_attribute_matches(
        "title",
        &Expect::is("Hello"),
        &Expect::is("Bye")
    ));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_save_without_changes_skips_write() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(article_schema(), [("title", Value::from("Hello"))])?;
    assert!(!repo.save(&mut article)?);
    assert_eq!(repo.store().write_count(), 0);
    assert!(article.attribute_previously_changed("title"));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_failed_write_keeps_pending_changes() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(article_schema(), [("title", Value::from("Hello"))])?;
    article.write_attribute("title", "Bye");

    repo.store().fail_next_write();
    assert!(matches!(repo.save(&mut article), Err(ModelError::Store(_))));
    assert!(article.attribute_changed("title", &Expect::is("Hello"), &Expect::is("Bye")));

    assert!(repo.save(&mut article)?);
    assert!(!article.is_changed());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_unset_removes_stored_key() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(
        article_schema(),
        [("title", Value::from("Hello")), ("status", Value::from("live"))],
    )?;
    let id = article.id().map(str::to_string).unwrap();

    article.write_attribute("status", "gone");
    article.unset("status");
    repo.save(&mut article)?;

    let body = repo.store().body(&id)?.unwrap();
    assert!(body.get("status").is_none());
    assert!(article.atomic_unsets().is_empty());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_changed_child_saved_and_committed() -> anyhow::Result<()> {
    let repo = repository();
    let mut author = Record::new(author_schema());
    author.write_attribute("name", "Ann");
    let mut article = repo.create(article_schema(), [("author", Value::from(author))])?;
    let id = article.id().map(str::to_string).unwrap();
    assert!(!article.is_changed());

    if let Some(author) = article.child_mut("author") {
        author.write_attribute("name", "Bo");
    }
    assert!(repo.save(&mut article)?);
    assert!(!article.is_changed());

    let body = repo.store().body(&id)?.unwrap();
    assert_eq!(body["author"], json!({"name": "Bo"}));

    let found = repo.find(article_schema(), &id)?;
    let author = found
        .read_attribute("author")
        .and_then(Value::as_document)
        .unwrap();
    assert_eq!(author.read_attribute("name"), Some(&Value::from("Bo")));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_duplicate_members_round_trip_through_store() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(
        article_schema(),
        [("readers", Value::from(vec!["u1", "u1", "u2"]))],
    )?;
    let id = article.id().map(str::to_string).unwrap();

    article.write_attribute("readers", vec!["u1", "u2"]);
    repo.save(&mut article)?;
    let found = repo.find(article_schema(), &id)?;
    assert_eq!(found.read_attribute("readers"), article.read_attribute("readers"));

    article.write_attribute("readers", vec!["u1", "u1", "u2"]);
    repo.save(&mut article)?;
    let found = repo.find(article_schema(), &id)?;
    assert_eq!(
        found.read_attribute("readers"),
        Some(&Value::from(vec!["u1", "u1", "u2"]))
    );
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_written_child_commits_its_descendants() -> anyhow::Result<()> {
    let schema = SchemaDefinition::from_json_str(
        r#"{
            "kind": "company",
            "fields": [{"name": "office", "type": "document", "embeds": {
                "kind": "office",
                "fields": [
                    {"name": "city", "type": "string"},
                    {"name": "geo", "type": "document", "embeds": {
                        "kind": "geo",
                        "fields": [{"name": "lat", "type": "float"}]
                    }}
                ]
            }}]
        }"#,
    )?
    .build()?;

    let repo = repository();
    let mut company = repo.create(Arc::clone(&schema), [("office", Value::Null)])?;
    let id = company.id().map(str::to_string).unwrap();
    let found = repo.find(Arc::clone(&schema), &id)?;
    assert_eq!(found.read_attribute("office"), Some(&Value::Null));

    let office_schema = schema
        .lookup("office")
        .and_then(|field| field.embedded_schema())
        .cloned()
        .unwrap();
    let geo_schema = office_schema
        .lookup("geo")
        .and_then(|field| field.embedded_schema())
        .cloned()
        .unwrap();
    let mut office = Record::new(Arc::clone(&office_schema));
    office.write_attribute("city", "Oslo");
    office.write_attribute("geo", Record::new(geo_schema));
    company.write_attribute("office", office);
    repo.save(&mut company)?;

    let office = company.child_mut("office").unwrap();
    office.write_attribute("city", "Bergen");
    office.child_mut("geo").unwrap().write_attribute("lat", 60.4);
    assert!(repo.save(&mut company)?);

    let office = company.read_attribute("office").and_then(Value::as_document).unwrap();
    let geo = office.read_attribute("geo").and_then(Value::as_document).unwrap();
    assert!(!office.is_changed());
    assert!(!geo.has_attribute_changes());
    assert!(geo.attribute_previously_changed("lat"));

    let body = repo.store().body(&id)?.unwrap();
    assert_eq!(body["office"]["geo"]["lat"], json!(60.4));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_reload_discards_changes() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(article_schema(), [("title", Value::from("Hello"))])?;
    article.write_attribute("title", "Local");

    repo.reload(&mut article)?;
    assert_eq!(article.read_attribute("title"), Some(&Value::from("Hello")));
    assert!(!article.is_changed());
    assert!(article.previous_changes().is_empty());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_find_errors() -> anyhow::Result<()> {
    let repo = repository();
    assert!(repo.find_by_id(article_schema(), "missing")?.is_none());

    let author = repo.create(author_schema(), [("name", Value::from("Ann"))])?;
    let id = author.id().unwrap();
    let err = repo.find(article_schema(), id).unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { .. }));

    let mut unsaved = Record::hydrate(article_schema(), None, Default::default());
    assert!(matches!(
        repo.save(&mut unsaved),
        Err(ModelError::MissingId { .. })
    ));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_destroy() -> anyhow::Result<()> {
    let repo = repository();
    let mut article = repo.create(article_schema(), [("title", Value::from("Hello"))])?;
    let id = article.id().map(str::to_string).unwrap();

    repo.destroy(&mut article)?;
    assert!(repo.find_by_id(article_schema(), &id)?.is_none());
    assert!(article.previous_changes().is_empty());
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_config_threads_through_reads() -> anyhow::Result<()> {
    let config = ModelConfig {
        scan_consistency: ScanConsistency::NotBounded,
        include_id_in_json: false,
    };
    let repo = Repository::new(MemoryStore::new(), config);
    let article = repo.create(article_schema(), [("title", Value::from("Hello"))])?;
    let id = article.id().map(str::to_string).unwrap();

    repo.find(article_schema(), &id)?;
    assert_eq!(
        repo.store().last_read_options()?,
        Some(ReadOptions {
            scan_consistency: ScanConsistency::NotBounded
        })
    );
    assert!(repo.to_json(&article).get("id").is_none());
    Ok(())
}

#[timeout(5000)]
#[test]
fn test_concurrent_records_share_repository() -> anyhow::Result<()> {
    let repo = Arc::new(repository());
    let mut handles = Vec::new();

    for i in 0..8 {
        let repo = Arc::clone(&repo);
        handles.push(thread::spawn(move || -> docmap_core::Result<String> {
            let mut article = repo.create(article_schema(), [("title", Value::from(i))])?;
            article.write_attribute("title", i * 10 + 1);
            repo.save(&mut article)?;
            Ok(article.id().unwrap_or_default().to_string())
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let id = handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
        ids.push(id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(repo.store().write_count(), 8);

    let stored = repo.store().hydrate(&ids[0], &ReadOptions::default())?;
    assert_eq!(stored.kind, "article");
    Ok(())
}
