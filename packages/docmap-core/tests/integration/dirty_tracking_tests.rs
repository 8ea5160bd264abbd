//! Dirty tracking end to end, without a store.

use ntest::timeout;

use docmap_core::record::AccessorArgs;
use docmap_core::{Change, Expect, Record, UpdateOp, Value};

use super::helpers::{article_schema, author_schema};

#[timeout(1000)]
#[test]
fn test_full_change_cycle() -> anyhow::Result<()> {
    let mut article = Record::new(article_schema());
    assert!(article.changes().is_empty());

    article.write_attribute("title", "Hello");
    article.write_attribute("tags", vec!["rust"]);
    assert_eq!(article.changed(), vec!["tags".to_string(), "title".to_string()]);

    let ops = article.build_update_ops();
    assert_eq!(ops["ttl"], UpdateOp::Replace(Value::from("Hello")));
    assert_eq!(ops["tags"], UpdateOp::Replace(Value::from(vec!["rust"])));

    assert_eq!(article.changes_applied(), 2);
    assert!(!article.is_changed());
    assert!(article.saved_change_to_attribute_matches(
        "title",
        &Expect::is(Value::Null),
        &Expect::is("Hello")
    ));

    article.modify_attribute("tags", |tags| {
        if let Some(items) = tags.as_array_mut() {
            items.push(Value::from("orm"));
        }
    });
    let ops = article.build_update_ops();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops["tags"], UpdateOp::Push(vec![Value::from("orm")]));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_references_use_membership_ops() -> anyhow::Result<()> {
    let mut article = Record::new(article_schema());
    article.write_attribute("readers", vec!["u1", "u2"]);
    article.changes_applied();

    article.write_attribute("readers", vec!["u1", "u2", "u3"]);
    assert_eq!(
        article.build_update_ops()["readers"],
        UpdateOp::AddToSet(vec![Value::from("u3")])
    );

    article.reset_attribute("readers");
    article.write_attribute("readers", vec!["u2"]);
    assert_eq!(
        article.build_update_ops()["readers"],
        UpdateOp::Pull(vec![Value::from("u1")])
    );
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_dispatch_matches_direct_calls() -> anyhow::Result<()> {
    let mut article = Record::new(article_schema());
    article.call("title=", AccessorArgs::value("A"))?;
    article.call("status_will_change!", AccessorArgs::default())?;

    let via_call = article.call("title_change", AccessorArgs::default())?;
    assert_eq!(
        via_call,
        docmap_core::AccessorOutput::Change(article.attribute_change("title"))
    );
    assert_eq!(
        article.attribute_change("title"),
        Some(Change::new(Value::Null, Value::from("A")))
    );

    let methods = article.schema().accessors().method_names();
    assert!(methods.contains(&"reset_status_to_default!"));
    assert!(methods.contains(&"saved_change_to_author?"));
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_embedded_author_tracks_separately() -> anyhow::Result<()> {
    let mut author = Record::new(author_schema());
    author.write_attribute("name", "Ann");
    let mut article = Record::new(article_schema());
    article.write_attribute("author", author);

    assert!(article.has_attribute_changes());
    article.changes_applied();
    if let Some(author) = article.child_mut("author") {
        author.changes_applied();
    }
    assert!(!article.is_changed());

    if let Some(author) = article.child_mut("author") {
        author.write_attribute("name", "Bo");
    }
    assert!(article.is_changed());
    assert!(article.changes().is_empty());
    Ok(())
}
